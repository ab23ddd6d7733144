//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates building an index from a document
//! (chunk → embed → insert) and answering questions against it
//! (embed → search → answer).
//!
//! The pipeline starts [`Uninitialized`](PipelineState::Uninitialized).
//! A successful [`build`](RagPipeline::build) publishes an immutable
//! [`VectorIndex`] and moves it to [`Ready`](PipelineState::Ready); any build
//! failure leaves it uninitialized, so a partially embedded document is never
//! queried. Once ready, questions are served concurrently from a shared
//! `Arc<VectorIndex>` and a failed question leaves the index untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use hr_rag::{RagPipeline, RagConfig};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .answerer(Arc::new(my_answerer))
//!     .build()?;
//!
//! pipeline.build_from_path("HR_Policy.pdf").await?;
//! let answer = pipeline.answer("How many sick days do I get?").await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::answerer::Answerer;
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Answer, Document, QueryResult, Segment};
use crate::embedding::{EmbeddingProvider, check_embedding, with_deadline};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::loader::load_document;
use crate::retriever::Retriever;

/// Observable lifecycle state of a [`RagPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No index has been built; questions fail with [`RagError::IndexNotReady`].
    Uninitialized,
    /// An index is published and accepts questions.
    Ready,
}

/// Summary of a successful [`RagPipeline::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// The indexed document.
    pub document_id: String,
    /// Number of segments inserted into the index.
    pub segment_count: usize,
    /// Embedding dimension of the index.
    pub dimension: usize,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    answerer: Arc<dyn Answerer>,
    chunker: Arc<dyn Chunker>,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> PipelineState {
        if self.index.read().await.is_some() {
            PipelineState::Ready
        } else {
            PipelineState::Uninitialized
        }
    }

    /// Shared handle to the published index, e.g. for [`VectorIndex::save`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotReady`] before a successful build.
    pub async fn index(&self) -> Result<Arc<VectorIndex>> {
        self.index.read().await.clone().ok_or(RagError::IndexNotReady)
    }

    /// Load a document from `path` and [`build`](Self::build) the index from it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentLoadFailure`] if the document cannot be
    /// loaded, and any error from [`build`](Self::build). The pipeline is
    /// uninitialized after a failure.
    pub async fn build_from_path(&self, path: impl AsRef<Path>) -> Result<BuildReport> {
        self.discard().await;
        let document = load_document(path)?;
        self.build(&document).await
    }

    /// Build the index for `document`: chunk → embed → insert, then publish.
    ///
    /// Any previously published index is discarded first. On failure the
    /// pipeline stays uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentLoadFailure`] for an empty document,
    /// [`RagError::EmbeddingUnavailable`] if embedding fails, times out, or
    /// yields malformed vectors, and [`RagError::DimensionMismatch`] from the index.
    pub async fn build(&self, document: &Document) -> Result<BuildReport> {
        self.discard().await;

        let index = self.index_document(document).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "index build failed");
        })?;

        let report = BuildReport {
            document_id: document.id.clone(),
            segment_count: index.len(),
            dimension: index.dimension().unwrap_or(0),
        };
        *self.index.write().await = Some(Arc::new(index));

        info!(
            document.id = %report.document_id,
            segment_count = report.segment_count,
            dimension = report.dimension,
            "index ready"
        );
        Ok(report)
    }

    /// Publish a previously built index, e.g. one read with [`VectorIndex::load`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyIndex`] if `index` has no entries and
    /// [`RagError::DimensionMismatch`] if its dimension differs from the
    /// embedding provider's. The pipeline is uninitialized after a failure.
    pub async fn install_index(&self, index: VectorIndex) -> Result<()> {
        self.discard().await;
        if index.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        let provider_dimension = self.embedding_provider.dimensions();
        if let Some(expected) = index.dimension().filter(|d| *d != provider_dimension) {
            error!(expected, actual = provider_dimension, "index and embedding provider disagree");
            return Err(RagError::DimensionMismatch { expected, actual: provider_dimension });
        }
        info!(entries = index.len(), "index installed");
        *self.index.write().await = Some(Arc::new(index));
        Ok(())
    }

    /// Answer `question` using the configured `top_k` segments of context.
    ///
    /// # Errors
    ///
    /// See [`ask`](Self::ask).
    pub async fn answer(&self, question: &str) -> Result<String> {
        self.answer_with_k(question, self.config.top_k).await
    }

    /// Answer `question` using up to `k` segments of context.
    ///
    /// # Errors
    ///
    /// See [`ask`](Self::ask).
    pub async fn answer_with_k(&self, question: &str, k: usize) -> Result<String> {
        Ok(self.ask(question, k).await?.text)
    }

    /// Answer `question` and return the context segments alongside the text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotReady`] before a successful build,
    /// [`RagError::ConfigError`] if `k == 0`,
    /// [`RagError::EmbeddingUnavailable`] if the question cannot be embedded,
    /// [`RagError::AnswererUnavailable`] if generation fails, and
    /// [`RagError::AnswererTimeout`] if it exceeds `answer_timeout`. None of
    /// these change the pipeline state.
    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer> {
        let sources = self.retrieve(question, k).await?;
        let context: Vec<Segment> = sources.iter().map(|r| r.segment.clone()).collect();

        let text = self.generate(question, &context).await.inspect_err(|e| {
            error!(answerer = self.answerer.name(), error = %e, "answer generation failed");
        })?;

        info!(context_segments = context.len(), answer_len = text.len(), "question answered");
        Ok(Answer { text, sources })
    }

    /// Retrieve up to `k` scored segments for `question` without generating an answer.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotReady`] before a successful build,
    /// [`RagError::ConfigError`] if `k == 0`, and any retrieval error.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        self.retriever().await?.retrieve_scored(question, k).await
    }

    /// A retriever over the published index.
    async fn retriever(&self) -> Result<Retriever> {
        let index = self.index().await?;
        Ok(Retriever::new(Arc::clone(&self.embedding_provider), index)
            .with_timeout(self.config.embed_timeout))
    }

    async fn generate(&self, question: &str, context: &[Segment]) -> Result<String> {
        let call = self.answerer.answer(question, context);
        match self.config.answer_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| RagError::AnswererTimeout { timeout })?,
            None => call.await,
        }
    }

    async fn discard(&self) {
        if self.index.write().await.take().is_some() {
            info!("discarded previous index");
        }
    }

    /// Build a fresh index without publishing it.
    async fn index_document(&self, document: &Document) -> Result<VectorIndex> {
        if document.text.trim().is_empty() {
            return Err(RagError::DocumentLoadFailure {
                source_id: document.id.clone(),
                message: "document contains no text".to_string(),
            });
        }

        // 1. Chunk the document
        let segments = self.chunker.chunk(document);

        // 2. Embed every segment
        let provider = self.embedding_provider.name().to_string();
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let embeddings = with_deadline(
            &provider,
            self.config.embed_timeout,
            self.embedding_provider.embed_batch(&texts),
        )
        .await?;

        if embeddings.len() != segments.len() {
            return Err(RagError::embedding(
                &provider,
                format!("returned {} embeddings for {} segments", embeddings.len(), segments.len()),
            ));
        }

        // 3. Insert into a fresh index
        let dimensions = self.embedding_provider.dimensions();
        let mut index = VectorIndex::with_dimension(dimensions);
        for (segment, embedding) in segments.into_iter().zip(embeddings) {
            check_embedding(&provider, &embedding, dimensions)?;
            index.insert(segment, embedding)?;
        }

        Ok(index)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider and answerer are required. The configuration
/// defaults to [`RagConfig::default()`] and the chunker to a
/// [`RecursiveChunker`] derived from the configuration.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().chunk_size(500).chunk_overlap(50).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .answerer(Arc::new(answerer))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    answerer: Option<Arc<dyn Answerer>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the answerer.
    pub fn answerer(mut self, answerer: Arc<dyn Answerer>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    /// Override the chunker derived from the configuration.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let answerer =
            self.answerer.ok_or_else(|| RagError::ConfigError("answerer is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };

        Ok(RagPipeline { config, embedding_provider, answerer, chunker, index: RwLock::new(None) })
    }
}
