//! Answer generation from a question and retrieved context.

use async_trait::async_trait;

use crate::document::Segment;
use crate::error::Result;

/// Line placed between context segments so the model sees their boundaries.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// A capability that writes a natural-language answer to a question,
/// conditioned on retrieved context.
///
/// Implementations report service failures as
/// [`RagError::AnswererUnavailable`](crate::RagError::AnswererUnavailable).
/// Deadlines are enforced by the caller.
///
/// # Example
///
/// ```rust,ignore
/// use hr_rag::Answerer;
///
/// let text = answerer.answer("How many sick days?", &segments).await?;
/// ```
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Answer `question` using `context`, ordered most relevant first.
    async fn answer(&self, question: &str, context: &[Segment]) -> Result<String>;

    /// Short name used in logs and error messages.
    fn name(&self) -> &str {
        "answerer"
    }
}

/// Join segment texts into one context block.
pub fn build_context(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.trim()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Render the instruction prompt sent to a completion model.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an HR assistant. Answer the question using only the policy excerpts below. \
         If the excerpts do not contain the answer, say that you don't know instead of \
         guessing.\n\n\
         Policy excerpts:\n{context}\n\n\
         Question: {question}\n\
         Answer:"
    )
}
