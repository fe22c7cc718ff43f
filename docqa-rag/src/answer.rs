//! Answer orchestration: retrieve, assemble a bounded context, generate.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::document::{AnswerResult, Chunk, RetrievalResult};
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::retriever::Retriever;

/// Answer text returned when retrieval finds nothing to ground an answer on.
pub const NO_CONTEXT_ANSWER: &str = "No relevant context found.";

/// Separator placed between chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The text handed to the generation provider and the chunks it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    /// Chunk texts in rank order, joined by [`CONTEXT_SEPARATOR`].
    pub text: String,
    /// The chunks that made it into `text`.
    pub chunks: Vec<Chunk>,
}

/// Concatenate retrieved chunks, best first, into at most `budget` characters.
///
/// Chunks are taken whole; the first chunk that does not fit ends the block.
/// If the top-ranked chunk alone exceeds the budget it is cut at `budget`
/// characters so that the block is never empty.
pub fn build_context(retrieved: &RetrievalResult, budget: usize) -> ContextBlock {
    let separator_len = CONTEXT_SEPARATOR.chars().count();
    let mut text = String::new();
    let mut chunks = Vec::new();
    let mut used = 0;

    for chunk in retrieved.chunks() {
        let chunk_len = chunk.text.chars().count();
        let needed = if chunks.is_empty() { chunk_len } else { separator_len + chunk_len };

        if used + needed > budget {
            if chunks.is_empty() {
                warn!(
                    source_id = %chunk.source_id,
                    chunk_len,
                    budget,
                    "top-ranked chunk exceeds context budget; truncating"
                );
                text.extend(chunk.text.chars().take(budget));
                chunks.push(chunk.clone());
            }
            break;
        }

        if !chunks.is_empty() {
            text.push_str(CONTEXT_SEPARATOR);
        }
        text.push_str(&chunk.text);
        chunks.push(chunk.clone());
        used += needed;
    }

    ContextBlock { text, chunks }
}

/// Answers questions by stuffing the top-ranked passages into one prompt.
///
/// Each [`answer`](AnswerOrchestrator::answer) call runs retrieval and then
/// generation to completion. Generation failures are not retried.
#[derive(Clone)]
pub struct AnswerOrchestrator {
    retriever: Retriever,
    generation_provider: Arc<dyn GenerationProvider>,
    max_context_characters: usize,
}

impl AnswerOrchestrator {
    /// Create an orchestrator with the given context budget in characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `max_context_characters == 0`.
    pub fn new(
        retriever: Retriever,
        generation_provider: Arc<dyn GenerationProvider>,
        max_context_characters: usize,
    ) -> Result<Self> {
        if max_context_characters == 0 {
            return Err(RagError::InvalidParameter(
                "max_context_characters must be greater than zero".to_string(),
            ));
        }
        Ok(Self { retriever, generation_provider, max_context_characters })
    }

    /// The retriever used for the first step of every answer.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `query` from the indexed corpus.
    ///
    /// When nothing is retrieved the result carries [`NO_CONTEXT_ANSWER`] and
    /// no supporting chunks, and the generation provider is not called.
    ///
    /// # Errors
    ///
    /// - Retrieval errors from [`Retriever::relevant_passages`].
    /// - [`RagError::GenerationUnavailable`] if the generation provider fails.
    pub async fn answer(&self, query: &str) -> Result<AnswerResult> {
        let retrieved = self.retriever.relevant_passages(query).await?;
        if retrieved.is_empty() {
            info!("no relevant context found; generation skipped");
            return Ok(AnswerResult {
                answer_text: NO_CONTEXT_ANSWER.to_string(),
                supporting_chunks: Vec::new(),
            });
        }

        let context = build_context(&retrieved, self.max_context_characters);
        let provider = self.generation_provider.name();
        let answer_text =
            self.generation_provider.generate(&context.text, query).await.map_err(|e| {
                error!(provider, error = %e, "generation failed");
                match e {
                    err @ RagError::GenerationUnavailable { .. } => err,
                    other => RagError::GenerationUnavailable {
                        provider: provider.to_string(),
                        message: other.to_string(),
                    },
                }
            })?;

        info!(
            retrieved = retrieved.len(),
            supporting = context.chunks.len(),
            context_chars = context.text.chars().count(),
            "answer generated"
        );

        Ok(AnswerResult { answer_text, supporting_chunks: context.chunks })
    }
}
