//! Embedding provider trait for generating vector embeddings from text.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// Failures should be reported as [`RagError::EmbeddingUnavailable`].
///
/// # Example
///
/// ```rust,ignore
/// use hr_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("annual leave").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input and stops at the first failure.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedder"
    }
}

/// Reject embeddings with the wrong length or non-finite components.
///
/// A provider returning such output is treated as unavailable rather than
/// letting a malformed vector reach the index.
pub fn check_embedding(provider: &str, embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() != expected {
        return Err(RagError::embedding(
            provider,
            format!("expected a {expected}-dimensional embedding, got {}", embedding.len()),
        ));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(RagError::embedding(provider, "embedding contains non-finite values"));
    }
    Ok(())
}

/// Run an embedding call under an optional deadline.
///
/// Errors other than [`RagError::EmbeddingUnavailable`] are re-labelled so
/// callers always see an embedding failure as such.
pub(crate) async fn with_deadline<T>(
    provider: &str,
    timeout: Option<Duration>,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(RagError::embedding(provider, format!("no response within {limit:?}")));
            }
        },
        None => call.await,
    };
    outcome.map_err(|e| match e {
        RagError::EmbeddingUnavailable { .. } => e,
        other => RagError::embedding(provider, other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_slow_calls_into_embedding_errors() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1.0])
        };
        let err = with_deadline("mock", Some(Duration::from_secs(1)), slow).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingUnavailable { .. }));
    }

    #[tokio::test]
    async fn deadline_relabels_foreign_errors() {
        let failing = async { Err::<Vec<f32>, _>(RagError::EmptyIndex) };
        let err = with_deadline("mock", None, failing).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingUnavailable { ref provider, .. } if provider == "mock"));
    }

    #[test]
    fn check_embedding_flags_wrong_length_and_nan() {
        assert!(check_embedding("mock", &[1.0, 0.0], 2).is_ok());
        assert!(matches!(
            check_embedding("mock", &[1.0], 2),
            Err(RagError::EmbeddingUnavailable { .. })
        ));
        assert!(matches!(
            check_embedding("mock", &[f32::NAN, 0.0], 2),
            Err(RagError::EmbeddingUnavailable { .. })
        ));
    }
}
