//! In-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] keeps every embedding in one contiguous row-major buffer
//! with its magnitude cached at insertion, so a query is a single exhaustive
//! pass of dot products followed by a bounded top-k selection.

use std::cmp::Ordering;

use tracing::debug;

use crate::document::{Chunk, Embedding, RetrievalResult, SearchResult};
use crate::error::{RagError, Result};

/// A borrowed view of one chunk and its embedding inside a [`VectorIndex`].
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<'a> {
    /// The indexed chunk.
    pub chunk: &'a Chunk,
    /// The chunk's embedding.
    pub embedding: &'a [f32],
}

/// An exhaustive-scan vector index over chunk embeddings.
///
/// The first non-empty [`insert_batch`](VectorIndex::insert_batch) fixes the
/// dimensionality; every later embedding and query must match it. Entries
/// are never updated or removed. Once built, the index is only read, so it
/// can be shared across tasks behind an `Arc` without locking.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::VectorIndex;
///
/// let mut index = VectorIndex::new();
/// index.insert_batch(chunks.into_iter().zip(embeddings).collect())?;
/// let results = index.search(&query_embedding, 3)?;
/// ```
#[derive(Debug, Default, Clone)]
pub struct VectorIndex {
    dimensions: Option<usize>,
    /// Row-major matrix, one row of `dimensions` floats per entry.
    vectors: Vec<f32>,
    /// Magnitudes in `f64` so that large finite components cannot overflow.
    norms: Vec<f64>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index that only accepts `dimensions`-long embeddings.
    ///
    /// A `dimensions` of zero leaves the dimensionality to the first insert.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions: (dimensions > 0).then_some(dimensions), ..Self::default() }
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The dimensionality of indexed embeddings, once established.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Iterate over the indexed entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = IndexEntry<'_>> {
        let dims = self.dimensions.unwrap_or(0).max(1);
        self.chunks
            .iter()
            .zip(self.vectors.chunks_exact(dims))
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
    }

    /// Append chunk/embedding pairs to the index.
    ///
    /// The batch is validated as a whole before anything is appended, so a
    /// failed call leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if an embedding's length differs from
    ///   the index dimensionality (or from the first embedding of the batch
    ///   when the index is still empty).
    /// - [`RagError::InvalidParameter`] for zero-length embeddings or
    ///   embeddings containing NaN or infinite values.
    pub fn insert_batch(&mut self, entries: Vec<(Chunk, Embedding)>) -> Result<()> {
        let Some((_, first)) = entries.first() else {
            return Ok(());
        };
        let dims = self.dimensions.unwrap_or(first.len());
        if dims == 0 {
            return Err(RagError::InvalidParameter("embeddings must not be empty".to_string()));
        }

        for (chunk, embedding) in &entries {
            if embedding.len() != dims {
                return Err(RagError::DimensionMismatch { expected: dims, actual: embedding.len() });
            }
            if embedding.iter().any(|x| !x.is_finite()) {
                return Err(RagError::InvalidParameter(format!(
                    "embedding for chunk {} of '{}' contains non-finite values",
                    chunk.index, chunk.source_id
                )));
            }
        }

        self.dimensions = Some(dims);
        self.vectors.reserve(entries.len() * dims);
        self.norms.reserve(entries.len());
        self.chunks.reserve(entries.len());
        for (chunk, embedding) in entries {
            self.norms.push(magnitude(&embedding));
            self.vectors.extend_from_slice(&embedding);
            self.chunks.push(chunk);
        }

        debug!(entry_count = self.len(), dimensions = dims, "index batch inserted");
        Ok(())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Ties are broken by insertion order, earlier entries first. Searching an
    /// empty index returns an empty result.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] if `k == 0` or the query contains NaN
    ///   or infinite values.
    /// - [`RagError::DimensionMismatch`] if the query length differs from the
    ///   index dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidParameter("k must be greater than zero".to_string()));
        }
        let Some(dims) = self.dimensions.filter(|_| !self.is_empty()) else {
            return Ok(RetrievalResult::default());
        };
        if query.len() != dims {
            return Err(RagError::DimensionMismatch { expected: dims, actual: query.len() });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(RagError::InvalidParameter(
                "query embedding contains non-finite values".to_string(),
            ));
        }

        let query_norm = magnitude(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(dims)
            .zip(&self.norms)
            .map(|(row, &norm)| cosine_similarity(row, norm, query, query_norm))
            .enumerate()
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        let entries = scored
            .into_iter()
            .map(|(i, score)| SearchResult { chunk: self.chunks[i].clone(), score })
            .collect();
        Ok(RetrievalResult { entries })
    }
}

/// Descending score, then ascending insertion position.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Cosine similarity from precomputed magnitudes.
///
/// Accumulates in `f64`, so every finite input yields a finite score.
/// Returns 0.0 if either vector has zero magnitude, and never returns -0.0,
/// which would order below an equal +0.0 score.
fn cosine_similarity(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    let score = (dot / (norm_a * norm_b)) as f32;
    if score == 0.0 { 0.0 } else { score }
}
