//! # hr-rag
//!
//! Retrieval-augmented question answering over a single policy document.
//!
//! A document is split into overlapping segments, each segment is embedded,
//! and the vectors are kept in an in-memory [`VectorIndex`]. Questions are
//! embedded the same way, the nearest segments are retrieved, and an
//! [`Answerer`] writes a reply conditioned on them.
//!
//! ## Features
//!
//! - `openai`: OpenAI-compatible embedding and chat providers (the `openai` module)
//! - `pdf`: PDF text extraction in [`load_document`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hr_rag::{RagConfig, RagPipeline};
//! use hr_rag::openai::{OpenAIChatAnswerer, OpenAIEmbeddingProvider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_env()?))
//!         .answerer(Arc::new(OpenAIChatAnswerer::from_env()?))
//!         .build()?;
//!
//!     pipeline.build_from_path("HR_Policy.pdf").await?;
//!     println!("{}", pipeline.answer("How many days of paid leave do I get?").await?);
//!     Ok(())
//! }
//! ```

pub mod answerer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod retriever;

#[cfg(feature = "openai")]
pub mod openai;

pub use answerer::{Answerer, CONTEXT_SEPARATOR, build_context, build_prompt};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{DEFAULT_SEPARATORS, GenerationConfig, RagConfig, RagConfigBuilder};
pub use document::{Answer, Document, IndexEntry, QueryResult, ScoredSegment, Segment};
pub use embedding::{EmbeddingProvider, check_embedding};
pub use error::{RagError, Result};
pub use index::{INDEX_FORMAT_VERSION, SimilarityMetric, VectorIndex};
pub use loader::load_document;
pub use pipeline::{BuildReport, PipelineState, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatAnswerer, OpenAIEmbeddingProvider};
