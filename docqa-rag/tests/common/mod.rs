//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::{Embedding, EmbeddingProvider, GenerationProvider, RagError, Result};

/// Bag-of-words embedder: each lowercase word is hashed into one of
/// `dimensions` buckets. Texts sharing words point in similar directions.
pub struct BagOfWordsEmbedder {
    pub dimensions: usize,
}

impl BagOfWordsEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

fn bucket(word: &str, dimensions: usize) -> usize {
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    (hash % dimensions as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            embedding[bucket(&word.to_lowercase(), self.dimensions)] += 1.0;
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

/// Embedder that fails its first `failures` calls, then delegates.
pub struct FlakyEmbedder {
    pub inner: BagOfWordsEmbedder,
    pub failures: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(dimensions: usize, failures: usize) -> Self {
        Self { inner: BagOfWordsEmbedder::new(dimensions), failures: AtomicUsize::new(failures) }
    }

    fn should_fail(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if self.should_fail() {
            return Err(RagError::EmbeddingUnavailable {
                provider: "flaky".into(),
                message: "request timed out".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Embedder whose vectors are shorter than the dimensionality it declares.
pub struct MisreportingEmbedder;

#[async_trait]
impl EmbeddingProvider for MisreportingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Embedder that drops the last vector of every batch.
pub struct LossyBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for LossyBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(vec![1.0, 1.0])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 1.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Generator that records every call and echoes the question.
#[derive(Default)]
pub struct RecordingGenerator {
    pub calls: Mutex<Vec<(String, String)>>,
    pub failures: AtomicUsize,
}

impl RecordingGenerator {
    pub fn failing_first(failures: usize) -> Self {
        Self { calls: Mutex::new(Vec::new()), failures: AtomicUsize::new(failures) }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        self.calls.lock().unwrap().push((context.to_string(), question.to_string()));
        if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
        {
            return Err(RagError::GenerationUnavailable {
                provider: "recording".into(),
                message: "503 Service Unavailable".into(),
            });
        }
        Ok(format!("answer to: {question}"))
    }

    fn name(&self) -> &str {
        "recording"
    }
}
