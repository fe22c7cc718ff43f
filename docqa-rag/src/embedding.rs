//! The embedding collaborator.

use async_trait::async_trait;

use crate::document::Embedding;
use crate::error::Result;

/// Maps text to fixed-length vectors for similarity search.
///
/// The pipeline calls [`embed_batch`](EmbeddingProvider::embed_batch) once per
/// document during ingestion and [`embed`](EmbeddingProvider::embed) once per
/// question. Every vector a provider returns must have
/// [`dimensions`](EmbeddingProvider::dimensions) components; a provider that
/// cannot know its width up front may report 0 and let the first batch decide.
///
/// Report failures, timeouts included, as
/// [`RagError::EmbeddingUnavailable`](crate::RagError::EmbeddingUnavailable).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let vectors = embedder.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text, typically a question.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts, returning exactly one vector per input in input
    /// order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// A short name identifying the provider in errors and logs.
    fn name(&self) -> &str {
        "embedding"
    }
}
