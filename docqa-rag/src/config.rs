//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub max_chunk_size: usize,
    /// Number of characters shared by consecutive chunks.
    pub overlap: usize,
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Maximum length in characters of the context block handed to generation.
    pub max_context_characters: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { max_chunk_size: 1000, overlap: 250, top_k: 3, max_context_characters: 4000 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// Configurations obtained through deserialization bypass the builder,
    /// so the pipeline calls this again before use.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if:
    /// - `max_chunk_size == 0`
    /// - `overlap >= max_chunk_size`
    /// - `top_k == 0`
    /// - `max_context_characters < max_chunk_size`
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(RagError::InvalidParameter(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(RagError::InvalidParameter(format!(
                "overlap ({}) must be less than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidParameter("top_k must be greater than zero".to_string()));
        }
        // A single chunk must always fit in the generation context.
        if self.max_context_characters < self.max_chunk_size {
            return Err(RagError::InvalidParameter(format!(
                "max_context_characters ({}) must be at least max_chunk_size ({})",
                self.max_context_characters, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn overlap(mut self, overlap: usize) -> Self {
        self.config.overlap = overlap;
        self
    }

    /// Set the number of passages retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the context budget in characters.
    pub fn max_context_characters(mut self, budget: usize) -> Self {
        self.config.max_context_characters = budget;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
