//! Query-time retrieval over a built [`VectorIndex`].

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embeds questions and looks up their nearest chunks.
///
/// Every call re-embeds the query; nothing is cached between calls.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever returning `top_k` passages per query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `top_k == 0`.
    pub fn new(
        index: Arc<VectorIndex>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::InvalidParameter("top_k must be greater than zero".to_string()));
        }
        Ok(Self { index, embedding_provider, top_k })
    }

    /// The number of passages returned by [`relevant_passages`](Self::relevant_passages).
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Retrieve the configured number of passages for `query`.
    pub async fn relevant_passages(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve(query, self.top_k).await
    }

    /// Retrieve up to `k` passages for `query`, best match first.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] for a blank query or `k == 0`.
    /// - [`RagError::EmbeddingUnavailable`] if the embedding provider fails.
    /// - Index errors such as [`RagError::DimensionMismatch`] unchanged.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidParameter("query must not be blank".to_string()));
        }
        if k == 0 {
            return Err(RagError::InvalidParameter("k must be greater than zero".to_string()));
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(provider = self.embedding_provider.name(), error = %e, "query embedding failed");
            as_embedding_unavailable(self.embedding_provider.name(), e)
        })?;

        let result = self.index.search(&query_embedding, k)?;
        debug!(k, result_count = result.len(), "retrieval completed");
        Ok(result)
    }
}

/// Report any collaborator failure as [`RagError::EmbeddingUnavailable`],
/// keeping the provider's own description.
pub(crate) fn as_embedding_unavailable(provider: &str, err: RagError) -> RagError {
    match err {
        err @ RagError::EmbeddingUnavailable { .. } => err,
        other => {
            RagError::EmbeddingUnavailable { provider: provider.to_string(), message: other.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::document::{Chunk, Embedding};

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            Ok(if text.contains("cat") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding> {
            Err(RagError::InvalidParameter("model not loaded".to_string()))
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn chunk(text: &str, index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            start_offset: 0,
            end_offset: text.chars().count(),
            source_id: "pets.txt".to_string(),
            index,
        }
    }

    fn pet_index() -> Arc<VectorIndex> {
        let mut index = VectorIndex::new();
        index
            .insert_batch(vec![
                (chunk("the dog barked", 0), vec![0.0, 1.0]),
                (chunk("the cat purred", 1), vec![1.0, 0.0]),
            ])
            .unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn returns_best_match_first() {
        let retriever = Retriever::new(pet_index(), Arc::new(AxisEmbedder), 3).unwrap();
        let result = retriever.relevant_passages("where is the cat?").await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.entries[0].chunk.text, "the cat purred");
    }

    #[tokio::test]
    async fn explicit_k_overrides_default() {
        let retriever = Retriever::new(pet_index(), Arc::new(AxisEmbedder), 3).unwrap();
        assert_eq!(retriever.retrieve("dog", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_query_and_zero_k_are_invalid() {
        let retriever = Retriever::new(pet_index(), Arc::new(AxisEmbedder), 3).unwrap();
        assert!(matches!(retriever.retrieve("   ", 3).await, Err(RagError::InvalidParameter(_))));
        assert!(matches!(retriever.retrieve("cat", 0).await, Err(RagError::InvalidParameter(_))));
        assert!(Retriever::new(pet_index(), Arc::new(AxisEmbedder), 0).is_err());
    }

    #[tokio::test]
    async fn provider_failure_becomes_embedding_unavailable() {
        let retriever = Retriever::new(pet_index(), Arc::new(BrokenEmbedder), 3).unwrap();
        let err = retriever.relevant_passages("cat").await.unwrap_err();
        match err {
            RagError::EmbeddingUnavailable { provider, message } => {
                assert_eq!(provider, "broken");
                assert!(message.contains("model not loaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
