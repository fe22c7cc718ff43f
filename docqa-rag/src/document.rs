//! Data types for documents, chunks, and retrieval results.

use serde::{Deserialize, Serialize};

/// A fixed-length vector produced by an [`EmbeddingProvider`](crate::EmbeddingProvider).
pub type Embedding = Vec<f32>;

/// A source document: its identifier and full text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source identifier for the document, e.g. the uploaded file name.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document from a source identifier and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), source_uri: None }
    }

    /// Returns `true` if the document has no usable (non-whitespace) text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A contiguous segment of a [`Document`]'s text.
///
/// Offsets count characters (Unicode scalar values), not bytes, and
/// `end_offset` is exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Character offset of the first character in the source text.
    pub start_offset: usize,
    /// Character offset one past the last character in the source text.
    pub end_offset: usize,
    /// The ID of the parent [`Document`].
    pub source_id: String,
    /// Position of this chunk within its document.
    pub index: usize,
}

impl Chunk {
    /// Number of characters covered by this chunk.
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// A retrieved [`Chunk`] paired with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// Ranked results of a single query, ordered by descending score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// The ranked entries, best match first.
    pub entries: Vec<SearchResult>,
}

impl RetrievalResult {
    /// Number of retrieved entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the retrieved entries in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.entries.iter()
    }

    /// Iterate over the retrieved chunks in rank order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|r| &r.chunk)
    }
}

impl IntoIterator for RetrievalResult {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The answer to a question together with the passages it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    /// Text returned by the generation provider, or a notice that no context was found.
    pub answer_text: String,
    /// The chunks that were placed in the generation context, in rank order.
    pub supporting_chunks: Vec<Chunk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_serializes_as_id_and_text() {
        let value = serde_json::to_value(Document::new("a.txt", "hello")).unwrap();
        assert_eq!(value, serde_json::json!({ "id": "a.txt", "text": "hello" }));

        let doc: Document =
            serde_json::from_str(r#"{"id":"b.txt","text":"hi","source_uri":"/tmp/b.txt"}"#)
                .unwrap();
        assert_eq!(doc.source_uri.as_deref(), Some("/tmp/b.txt"));
        assert!(!doc.is_blank());
    }
}
