//! Data types for documents, segments, and retrieval results.

use serde::{Deserialize, Serialize};

/// A source document containing text content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier for the document, typically the source file name.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document from an identifier and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), source_uri: None }
    }

    /// Attach the URI of the original source.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A contiguous span of a [`Document`] produced by a chunker.
///
/// `start` and `end` are byte offsets into the parent document's text and
/// always fall on character boundaries, so `&document.text[start..end] == text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this segment in chunker output.
    pub index: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// The text content of the segment.
    pub text: String,
}

impl Segment {
    /// Length of the segment in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the segment covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A [`Segment`] paired with its embedding, as stored by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The stored segment.
    pub segment: Segment,
    /// The vector embedding for the segment's text.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Segment`] paired with a similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredSegment {
    /// The retrieved segment.
    pub segment: Segment,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// Segments ordered by descending similarity.
pub type QueryResult = Vec<ScoredSegment>;

/// A generated answer together with the context it was conditioned on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The answer text returned by the answerer.
    pub text: String,
    /// The retrieved segments passed as context, most relevant first.
    pub sources: QueryResult,
}
