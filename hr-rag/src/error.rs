//! Error types for the `hr-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building an index or answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// An embedding's length disagrees with the index dimension.
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension established by the index.
        expected: usize,
        /// The length of the offending embedding.
        actual: usize,
    },

    /// A query was issued against an index with no entries.
    #[error("Vector index is empty")]
    EmptyIndex,

    /// The embedding capability failed or returned malformed output.
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion capability failed or returned malformed output.
    #[error("Answerer unavailable ({provider}): {message}")]
    AnswererUnavailable {
        /// The answerer that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion capability did not answer within the configured deadline.
    #[error("Answerer timed out after {timeout:?}")]
    AnswererTimeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// A question was asked before an index was built.
    #[error("Index not ready: build an index before asking questions")]
    IndexNotReady,

    /// The source document is missing, unreadable, unparseable, or empty.
    #[error("Failed to load document '{source_id}': {message}")]
    DocumentLoadFailure {
        /// Path or identifier of the document.
        source_id: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A persisted index file is malformed or inconsistent.
    #[error("Index file error: {0}")]
    Persistence(String),

    /// I/O failure while reading or writing an index file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure for an index file.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Shorthand for [`RagError::EmbeddingUnavailable`].
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable { provider: provider.into(), message: message.into() }
    }

    /// Shorthand for [`RagError::AnswererUnavailable`].
    pub fn answerer(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AnswererUnavailable { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
