//! Session-scoped RAG pipeline.
//!
//! A [`RagPipeline`] is one question-answering session over one corpus. It
//! starts **Unindexed**, where every query fails with
//! [`RagError::NotReady`]. A successful [`ingest`](RagPipeline::ingest) over
//! a corpus with usable text builds the vector index and moves the session
//! to **Ready** for the rest of its life. A failed ingest leaves it
//! Unindexed; a second ingest on a Ready session fails with
//! [`RagError::AlreadyIndexed`]. Changing the corpus means building a new
//! session.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{Document, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generation_provider(Arc::new(my_llm))
//!     .build()?;
//!
//! pipeline.ingest(&[Document::new("notes.txt", text)]).await?;
//! let answer = pipeline.answer("What did the notes say about Rust?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::answer::AnswerOrchestrator;
use crate::chunking::{BoundaryChunker, Chunker};
use crate::config::RagConfig;
use crate::document::{AnswerResult, Document, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::index::VectorIndex;
use crate::retriever::{Retriever, as_embedding_unavailable};

/// The lifecycle phase of a [`RagPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No corpus has been indexed; queries are rejected.
    Unindexed,
    /// The index is built; queries are accepted.
    Ready,
}

/// Counts reported by a successful [`RagPipeline::ingest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Documents that contributed chunks to the index.
    pub documents: usize,
    /// Documents skipped because they held no usable text.
    pub skipped_documents: usize,
    /// Chunks stored in the index.
    pub chunks: usize,
    /// Dimensionality of the stored embeddings.
    pub dimensions: usize,
}

enum SessionState {
    Unindexed,
    Ready(AnswerOrchestrator),
}

/// One question-answering session over an in-memory corpus.
///
/// Construct one via [`RagPipeline::builder()`]. The pipeline is `Send + Sync`
/// and can be shared behind an `Arc`; queries only hold the state lock long
/// enough to clone the built orchestrator.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generation_provider: Arc<dyn GenerationProvider>,
    chunker: Arc<dyn Chunker>,
    state: RwLock<SessionState>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        match &*self.state.read().await {
            SessionState::Unindexed => SessionPhase::Unindexed,
            SessionState::Ready(_) => SessionPhase::Ready,
        }
    }

    /// Returns `true` once a corpus has been indexed.
    pub async fn is_ready(&self) -> bool {
        self.phase().await == SessionPhase::Ready
    }

    /// Return the built index, if the session is Ready.
    pub async fn index(&self) -> Option<Arc<VectorIndex>> {
        match &*self.state.read().await {
            SessionState::Unindexed => None,
            SessionState::Ready(orchestrator) => Some(orchestrator.retriever().index().clone()),
        }
    }

    /// Chunk, embed, and index a corpus, moving the session to Ready.
    ///
    /// Documents whose text is empty or whitespace-only are skipped. Each
    /// remaining document is embedded in one batch.
    ///
    /// # Errors
    ///
    /// The session stays Unindexed on any error:
    /// - [`RagError::AlreadyIndexed`] if the session is already Ready.
    /// - [`RagError::EmptyCorpus`] if no document yields any chunk.
    /// - [`RagError::EmbeddingUnavailable`] if the embedding provider fails
    ///   or returns the wrong number of vectors.
    /// - [`RagError::DimensionMismatch`] if vectors disagree with the
    ///   provider's declared dimensionality or with each other.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestSummary> {
        if self.is_ready().await {
            return Err(RagError::AlreadyIndexed);
        }

        let usable: Vec<&Document> = documents.iter().filter(|d| !d.is_blank()).collect();
        let skipped_documents = documents.len() - usable.len();
        if usable.is_empty() {
            warn!(document_count = documents.len(), "ingest rejected: corpus has no usable text");
            return Err(RagError::EmptyCorpus);
        }

        let mut index = match self.embedding_provider.dimensions() {
            0 => VectorIndex::new(),
            dims => VectorIndex::with_dimensions(dims),
        };
        let mut indexed_documents = 0;

        for document in usable {
            let chunks = self.chunker.chunk(document);
            if chunks.is_empty() {
                continue;
            }

            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let provider = self.embedding_provider.name();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                as_embedding_unavailable(provider, e)
            })?;
            if embeddings.len() != chunks.len() {
                error!(
                    document.id = %document.id,
                    expected = chunks.len(),
                    actual = embeddings.len(),
                    "embedding provider returned wrong number of vectors"
                );
                return Err(RagError::EmbeddingUnavailable {
                    provider: provider.to_string(),
                    message: format!(
                        "returned {} embeddings for {} chunks of '{}'",
                        embeddings.len(),
                        chunks.len(),
                        document.id
                    ),
                });
            }

            let chunk_count = chunks.len();
            index.insert_batch(chunks.into_iter().zip(embeddings).collect()).inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "indexing failed during ingestion");
            })?;
            indexed_documents += 1;
            debug!(document.id = %document.id, chunk_count, "document indexed");
        }

        if index.is_empty() {
            warn!("ingest rejected: chunker produced no chunks");
            return Err(RagError::EmptyCorpus);
        }

        let summary = IngestSummary {
            documents: indexed_documents,
            skipped_documents,
            chunks: index.len(),
            dimensions: index.dimensions().unwrap_or_default(),
        };

        let retriever =
            Retriever::new(Arc::new(index), self.embedding_provider.clone(), self.config.top_k)?;
        let orchestrator = AnswerOrchestrator::new(
            retriever,
            self.generation_provider.clone(),
            self.config.max_context_characters,
        )?;

        let mut state = self.state.write().await;
        if matches!(*state, SessionState::Ready(_)) {
            // Another ingest finished while this one was embedding.
            return Err(RagError::AlreadyIndexed);
        }
        *state = SessionState::Ready(orchestrator);

        info!(
            documents = summary.documents,
            skipped = summary.skipped_documents,
            chunk_count = summary.chunks,
            dimensions = summary.dimensions,
            "corpus indexed"
        );
        Ok(summary)
    }

    /// Retrieve the configured `top_k` passages for `query`.
    ///
    /// # Errors
    ///
    /// [`RagError::NotReady`] before ingestion; otherwise as
    /// [`Retriever::retrieve`].
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.orchestrator().await?.retriever().relevant_passages(query).await
    }

    /// Retrieve up to `k` passages for `query`.
    pub async fn retrieve_top_k(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.orchestrator().await?.retriever().retrieve(query, k).await
    }

    /// Answer `query` from the indexed corpus.
    ///
    /// # Errors
    ///
    /// [`RagError::NotReady`] before ingestion; otherwise as
    /// [`AnswerOrchestrator::answer`]. Errors never change the session phase.
    pub async fn answer(&self, query: &str) -> Result<AnswerResult> {
        self.orchestrator().await?.answer(query).await
    }

    async fn orchestrator(&self) -> Result<AnswerOrchestrator> {
        match &*self.state.read().await {
            SessionState::Unindexed => Err(RagError::NotReady),
            SessionState::Ready(orchestrator) => Ok(orchestrator.clone()),
        }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// Both providers are required. The configuration defaults to
/// [`RagConfig::default()`] and the chunker to a [`BoundaryChunker`] using the
/// configured size and overlap.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().top_k(5).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .generation_provider(Arc::new(llm))
///     .chunker(Arc::new(my_chunker))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Replace the default [`BoundaryChunker`].
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`] in the Unindexed phase.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if a provider is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidParameter("embedding_provider is required".to_string())
        })?;
        let generation_provider = self.generation_provider.ok_or_else(|| {
            RagError::InvalidParameter("generation_provider is required".to_string())
        })?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(BoundaryChunker::from_config(&config)?),
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            generation_provider,
            chunker,
            state: RwLock::new(SessionState::Unindexed),
        })
    }
}
