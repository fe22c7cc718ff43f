//! # docqa-rag
//!
//! Retrieval-augmented question answering over a corpus of text documents
//! held in memory for one session.
//!
//! The crate covers the retrieval side of the pipeline:
//!
//! - [`BoundaryChunker`] splits documents into overlapping chunks that end on
//!   paragraph, sentence, or word boundaries where possible.
//! - [`VectorIndex`] stores chunk embeddings and answers exhaustive top-k
//!   cosine-similarity queries with deterministic tie-breaking.
//! - [`Retriever`] embeds a question and searches the index.
//! - [`AnswerOrchestrator`] packs the best chunks into a bounded context and
//!   hands it to a [`GenerationProvider`].
//! - [`RagPipeline`] ties these together into a session that moves from
//!   Unindexed to Ready exactly once.
//!
//! Embedding and generation are external collaborators behind the
//! [`EmbeddingProvider`] and [`GenerationProvider`] traits. With the `openai`
//! feature, [`openai`] provides HTTP implementations for OpenAI-compatible
//! servers, including Groq.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{RagConfig, RagPipeline, load_text_documents};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .generation_provider(Arc::new(llm))
//!     .build()?;
//!
//! let documents = load_text_documents(&["handbook.txt"]).await?;
//! pipeline.ingest(&documents).await?;
//!
//! let answer = pipeline.answer("How many vacation days do I get?").await?;
//! println!("{}", answer.answer_text);
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod source;

#[cfg(feature = "openai")]
pub mod openai;

pub use answer::{AnswerOrchestrator, ContextBlock, NO_CONTEXT_ANSWER, build_context};
pub use chunking::{BoundaryChunker, Chunker, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{AnswerResult, Chunk, Document, Embedding, RetrievalResult, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use index::{IndexEntry, VectorIndex};
pub use pipeline::{IngestSummary, RagPipeline, RagPipelineBuilder, SessionPhase};
pub use retriever::Retriever;
pub use source::{document_from_bytes, load_text_document, load_text_documents};

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
