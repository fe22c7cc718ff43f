//! Generation provider trait for answer synthesis.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation backend that answers a question from retrieved context.
///
/// The provider owns the prompt template: it receives the assembled context
/// block and the user's original question and returns free-form text.
/// Failures, including timeouts, should be reported as
/// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::GenerationProvider;
///
/// let answer = generator.generate("Paris is the capital of France.", "What is the capital of France?").await?;
/// ```
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce an answer to `question` conditioned on `context`.
    async fn generate(&self, context: &str, question: &str) -> Result<String>;

    /// A short name identifying the provider in errors and logs.
    fn name(&self) -> &str {
        "generation"
    }
}
