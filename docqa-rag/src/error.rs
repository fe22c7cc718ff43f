//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting a corpus or answering a question.
///
/// Collaborator failures ([`EmbeddingUnavailable`](RagError::EmbeddingUnavailable),
/// [`GenerationUnavailable`](RagError::GenerationUnavailable)) are transient and
/// safe to retry; everything else indicates a caller or configuration problem.
#[derive(Debug, Error)]
pub enum RagError {
    /// A chunking, configuration, or query parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An embedding does not have the dimensionality the index was built with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality established by the index.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// The embedding collaborator failed or timed out.
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation collaborator failed or timed out.
    #[error("Generation unavailable ({provider}): {message}")]
    GenerationUnavailable {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A query was issued before a corpus was indexed.
    #[error("Not ready: no corpus has been indexed in this session")]
    NotReady,

    /// Ingestion was attempted without any usable text.
    #[error("Empty corpus: no document contains usable text")]
    EmptyCorpus,

    /// Ingestion was attempted on a session that already holds an index.
    #[error("Already indexed: this session's corpus cannot be replaced")]
    AlreadyIndexed,

    /// A document could not be read from its source.
    #[error("Document source error ({source_id}): {message}")]
    DocumentSource {
        /// The identifier of the document that failed to load.
        source_id: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Returns `true` if retrying the single failed call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable { .. } | Self::GenerationUnavailable { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
