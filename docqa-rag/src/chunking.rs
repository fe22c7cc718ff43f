//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`BoundaryChunker`], which
//! cuts text into overlapping windows and pulls each cut back to the nearest
//! paragraph, sentence, or word boundary.

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations must return an empty `Vec` for a document with empty text
/// and must be deterministic.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into windows of at most `max_chunk_size` characters where
/// consecutive windows share exactly `overlap` characters.
///
/// A window that does not reach the end of the text is shortened so that it
/// ends right after, in order of preference:
///
/// 1. a paragraph break (`\n\n`),
/// 2. a sentence terminator (`.`, `!`, `?`) followed by whitespace,
/// 3. any whitespace character.
///
/// Only the last `(max_chunk_size - overlap) / 2` characters of the window are
/// searched; when none of them qualifies the window is cut at full length.
/// The next window then starts `overlap` characters before the cut.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{BoundaryChunker, Chunker, Document};
///
/// let chunker = BoundaryChunker::new(1000, 250)?;
/// let chunks = chunker.chunk(&Document::new("notes.txt", text));
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryChunker {
    max_chunk_size: usize,
    overlap: usize,
}

impl BoundaryChunker {
    /// Create a new `BoundaryChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] unless
    /// `max_chunk_size > 0` and `overlap < max_chunk_size`.
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(RagError::InvalidParameter(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= max_chunk_size {
            return Err(RagError::InvalidParameter(format!(
                "overlap ({overlap}) must be less than max_chunk_size ({max_chunk_size})"
            )));
        }
        Ok(Self { max_chunk_size, overlap })
    }

    /// Create a chunker from the chunking parameters of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.max_chunk_size, config.overlap)
    }

    /// The maximum number of characters per chunk.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// The number of characters shared by consecutive chunks.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// How far before the hard limit a boundary may be searched for.
    pub fn lookback(&self) -> usize {
        (self.max_chunk_size - self.overlap) / 2
    }

    /// Split `text` into chunks attributed to `source_id`.
    pub fn split(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        self.spans(&chars)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                text: chars[start..end].iter().collect(),
                start_offset: start,
                end_offset: end,
                source_id: source_id.to_string(),
                index,
            })
            .collect()
    }

    /// Compute `(start, end)` character spans for the given text.
    fn spans(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < len {
            let hard_end = (start + self.max_chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                // Cutting at or before start + overlap would stall the walk.
                let floor = (hard_end - self.lookback()).max(start + self.overlap + 1);
                find_boundary(chars, floor, hard_end).unwrap_or(hard_end)
            };

            spans.push((start, end));
            if end == len {
                break;
            }
            start = end - self.overlap;
        }

        spans
    }
}

impl Chunker for BoundaryChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.id, &document.text)
    }
}

/// Chunk raw text with the boundary policy of [`BoundaryChunker`].
///
/// The returned chunks carry an empty `source_id`.
///
/// # Errors
///
/// Returns [`RagError::InvalidParameter`] for an invalid size/overlap pair.
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(BoundaryChunker::new(max_chunk_size, overlap)?.split("", text))
}

/// Find the best cut position in `floor..=ceiling`, preferring the latest
/// paragraph break, then sentence break, then whitespace.
///
/// A cut position `e` means the chunk ends just before `chars[e]`.
fn find_boundary(chars: &[char], floor: usize, ceiling: usize) -> Option<usize> {
    let paragraph = |e: usize| e >= 2 && chars[e - 1] == '\n' && chars[e - 2] == '\n';
    let sentence = |e: usize| {
        e >= 2 && chars[e - 1].is_whitespace() && matches!(chars[e - 2], '.' | '!' | '?')
    };
    let whitespace = |e: usize| e >= 1 && chars[e - 1].is_whitespace();

    let rules: [&dyn Fn(usize) -> bool; 3] = [&paragraph, &sentence, &whitespace];
    rules.iter().find_map(|accept| (floor..=ceiling).rev().find(|&e| accept(e)))
}
