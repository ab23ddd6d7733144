//! Question-to-context retrieval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::document::{QueryResult, Segment};
use crate::embedding::{EmbeddingProvider, check_embedding, with_deadline};
use crate::error::Result;
use crate::index::VectorIndex;

/// Embeds a question and looks up the most similar segments in an index.
///
/// Holds a shared, read-only handle to the index, so any number of retrievers
/// can serve queries concurrently.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    timeout: Option<Duration>,
}

impl Retriever {
    /// Create a retriever over `index` using `embedder` for questions.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self { embedder, index, timeout: None }
    }

    /// Fail embedding calls that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Return up to `k` segments most relevant to `question`, best first.
    ///
    /// # Errors
    ///
    /// See [`retrieve_scored`](Self::retrieve_scored).
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Segment>> {
        Ok(self.retrieve_scored(question, k).await?.into_iter().map(|r| r.segment).collect())
    }

    /// Return up to `k` segments with their similarity scores, best first.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingUnavailable`](crate::RagError::EmbeddingUnavailable)
    /// if the embedder fails, times out, or returns a malformed vector, and
    /// propagates [`EmptyIndex`](crate::RagError::EmptyIndex) and
    /// [`DimensionMismatch`](crate::RagError::DimensionMismatch) from the index.
    pub async fn retrieve_scored(&self, question: &str, k: usize) -> Result<QueryResult> {
        let provider = self.embedder.name().to_string();

        let embedding = with_deadline(&provider, self.timeout, self.embedder.embed(question))
            .await
            .inspect_err(|e| error!(provider = %provider, error = %e, "question embedding failed"))?;
        check_embedding(&provider, &embedding, self.embedder.dimensions())?;

        let results = self.index.query(&embedding, k)?;
        debug!(k, result_count = results.len(), "retrieved context");
        Ok(results)
    }
}
