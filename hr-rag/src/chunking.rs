//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text on a ranked list of separators (paragraphs, lines, words, then
//! raw characters) and merges the pieces back into overlapping segments.
//!
//! All sizes are counted in characters. Segments are contiguous slices of the
//! source text, so dropping the overlap prefix of every segment after the
//! first and concatenating the rest reproduces the document exactly.

use crate::config::{DEFAULT_SEPARATORS, RagConfig};
use crate::document::{Document, Segment};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into segments.
pub trait Chunker: Send + Sync {
    /// Split a document into segments in left-to-right order.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Segment>;
}

/// Splits text hierarchically on a list of separators, then merges the pieces
/// into segments of at most `chunk_size` characters.
///
/// Each segment after the first begins exactly `chunk_overlap` characters
/// before the end of the previous one. Separators stay attached to the piece
/// they terminate. The empty separator, or running out of separators, falls
/// back to cutting at a fixed character count.
///
/// # Example
///
/// ```rust,ignore
/// use hr_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::try_new(100, 10)?;
/// let segments = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with the default separators.
    ///
    /// Out-of-range values are clamped when chunking: a zero `chunk_size`
    /// behaves as 1 and `chunk_overlap` is capped at `chunk_size - 1`. Use
    /// [`try_new`](Self::try_new) to reject them instead.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a new `RecursiveChunker`, validating the size parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn try_new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self::new(chunk_size, chunk_overlap))
    }

    /// Create a chunker from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self::try_new(config.chunk_size, config.chunk_overlap)?
            .with_separators(config.separators.iter().cloned()))
    }

    /// Replace the separator list. Earlier separators are preferred.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum number of characters per segment.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of characters shared by adjacent segments.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into character spans covering it in order.
    fn spans<'t>(&self, text: &'t str) -> (CharMap<'t>, Vec<Span>) {
        let chunk_size = self.chunk_size.max(1);
        let overlap = self.chunk_overlap.min(chunk_size - 1);
        let map = CharMap::new(text);

        // Keeping pieces within `chunk_size - overlap` leaves room for the
        // overlap prefix carried into the next segment.
        let budget = chunk_size - overlap;
        let mut pieces = Vec::new();
        split_pieces(&map, map.full_span(), &self.separators, budget, &mut pieces);

        let spans = merge_pieces(&pieces, chunk_size, overlap);
        (map, spans)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Segment> {
        if document.text.is_empty() {
            return Vec::new();
        }

        let (map, spans) = self.spans(&document.text);
        spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let start = map.byte(span.start);
                let end = map.byte(span.end);
                Segment {
                    id: format!("{}_{i}", document.id),
                    document_id: document.id.clone(),
                    index: i,
                    start,
                    end,
                    text: document.text[start..end].to_string(),
                }
            })
            .collect()
    }
}

/// A half-open range of character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn len(self) -> usize {
        self.end - self.start
    }
}

/// Maps character positions to byte offsets in a string.
struct CharMap<'a> {
    text: &'a str,
    /// Byte offset of every character, followed by `text.len()`.
    bounds: Vec<usize>,
}

impl<'a> CharMap<'a> {
    fn new(text: &'a str) -> Self {
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        Self { text, bounds }
    }

    fn full_span(&self) -> Span {
        Span { start: 0, end: self.bounds.len() - 1 }
    }

    fn byte(&self, char_pos: usize) -> usize {
        self.bounds[char_pos]
    }

    /// Character position of a byte offset that lies on a boundary.
    fn char_pos(&self, byte: usize) -> usize {
        self.bounds.binary_search(&byte).unwrap_or_else(|i| i)
    }

    fn slice(&self, span: Span) -> &'a str {
        &self.text[self.byte(span.start)..self.byte(span.end)]
    }
}

/// Recursively split `span` until every piece fits in `budget` characters.
fn split_pieces(
    map: &CharMap<'_>,
    span: Span,
    separators: &[String],
    budget: usize,
    out: &mut Vec<Span>,
) {
    if span.len() <= budget {
        if span.len() > 0 {
            out.push(span);
        }
        return;
    }

    let Some((separator, remaining)) = separators.split_first() else {
        split_chars(span, out);
        return;
    };
    if separator.is_empty() {
        split_chars(span, out);
        return;
    }

    let pieces = split_keeping_separator(map, span, separator);
    if pieces.len() == 1 {
        // Separator absent; try the next one on the whole span.
        split_pieces(map, span, remaining, budget, out);
        return;
    }
    for piece in pieces {
        split_pieces(map, piece, remaining, budget, out);
    }
}

/// Split a span at a separator, keeping the separator attached to the preceding piece.
fn split_keeping_separator(map: &CharMap<'_>, span: Span, separator: &str) -> Vec<Span> {
    let base = map.byte(span.start);
    let mut result = Vec::new();
    let mut start = span.start;

    for (pos, matched) in map.slice(span).match_indices(separator) {
        let end = map.char_pos(base + pos + matched.len());
        result.push(Span { start, end });
        start = end;
    }

    if start < span.end {
        result.push(Span { start, end: span.end });
    }

    result
}

/// Last resort: every character becomes its own piece, so merging cuts at
/// exactly `chunk_size` characters.
fn split_chars(span: Span, out: &mut Vec<Span>) {
    out.extend((span.start..span.end).map(|start| Span { start, end: start + 1 }));
}

/// Greedily merge contiguous pieces into segments of at most `chunk_size`
/// characters, starting each new segment `overlap` characters early.
///
/// Every piece is at most `chunk_size - overlap` long, so a closed segment is
/// always longer than `overlap` and a fresh one always fits its first piece.
fn merge_pieces(pieces: &[Span], chunk_size: usize, overlap: usize) -> Vec<Span> {
    let mut merged = Vec::new();
    let mut current: Option<Span> = None;

    for &piece in pieces {
        current = Some(match current {
            None => piece,
            Some(open) if piece.end - open.start <= chunk_size => {
                Span { start: open.start, end: piece.end }
            }
            Some(open) => {
                merged.push(open);
                let start = open.end - overlap.min(open.len());
                Span { start, end: piece.end }
            }
        });
    }

    if let Some(open) = current {
        merged.push(open);
    }

    merged
}
