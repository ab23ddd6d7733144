//! In-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] stores [`IndexEntry`] values in insertion order and ranks
//! them against a query embedding by exhaustive cosine similarity. It performs
//! no I/O except through the explicit [`save`](VectorIndex::save) and
//! [`load`](VectorIndex::load) methods.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{IndexEntry, QueryResult, ScoredSegment, Segment};
use crate::error::{RagError, Result};

/// Version tag written into persisted index files.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// The similarity function used to rank entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Dot product of the L2-normalized vectors.
    #[default]
    Cosine,
}

impl SimilarityMetric {
    /// Score two vectors of equal length. Higher is more similar.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// An in-memory nearest-neighbour index over segment embeddings.
///
/// The first insertion fixes the embedding dimension unless one was given to
/// [`with_dimension`](Self::with_dimension). Queries return entries in
/// descending score order; equal scores keep insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use hr_rag::VectorIndex;
///
/// let mut index = VectorIndex::new();
/// index.insert(segment, vec![0.1, 0.9])?;
/// let top = index.query(&[0.0, 1.0], 3)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: Option<usize>,
    metric: SimilarityMetric,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create an empty index whose dimension is set by the first insertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index that only accepts `dimension`-length embeddings.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension: Some(dimension), ..Self::default() }
    }

    /// The established embedding dimension, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// The similarity metric used for ranking.
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Add a segment with its embedding.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the embedding is empty or
    /// its length differs from the established dimension.
    pub fn insert(&mut self, segment: Segment, embedding: Vec<f32>) -> Result<()> {
        let expected = self.dimension.unwrap_or(embedding.len());
        if embedding.is_empty() || embedding.len() != expected {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension.unwrap_or(0),
                actual: embedding.len(),
            });
        }
        self.dimension = Some(expected);
        self.entries.push(IndexEntry { segment, embedding });
        Ok(())
    }

    /// Return up to `k` entries most similar to `embedding`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyIndex`] if nothing has been inserted and
    /// [`RagError::DimensionMismatch`] if the query length differs from the
    /// index dimension.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<QueryResult> {
        let Some(dimension) = self.dimension.filter(|_| !self.entries.is_empty()) else {
            return Err(RagError::EmptyIndex);
        };
        if embedding.len() != dimension {
            return Err(RagError::DimensionMismatch { expected: dimension, actual: embedding.len() });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, self.metric.score(&entry.embedding, embedding)))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        debug!(k, returned = scored.len(), entries = self.entries.len(), "index query");

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredSegment { segment: self.entries[i].segment.clone(), score })
            .collect())
    }

    /// Write the index to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] or [`RagError::Serialization`] on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = IndexFile {
            format_version: INDEX_FORMAT_VERSION,
            dimension: self.dimension.unwrap_or(0),
            metric: self.metric,
            entries: self.entries.clone(),
        };

        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &file)?;
        writer.flush()?;

        info!(path = %path.display(), entries = self.entries.len(), "saved vector index");
        Ok(())
    }

    /// Read an index previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Persistence`] if the file has an unknown version,
    /// or an entry disagrees with the recorded dimension, and
    /// [`RagError::Io`] / [`RagError::Serialization`] if it cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(fs::File::open(path)?);
        let file: IndexFile = serde_json::from_reader(reader)?;

        if file.format_version != INDEX_FORMAT_VERSION {
            return Err(RagError::Persistence(format!(
                "unsupported format version {} (expected {INDEX_FORMAT_VERSION})",
                file.format_version
            )));
        }

        let mut index = if file.entries.is_empty() {
            Self::new()
        } else {
            Self::with_dimension(file.dimension)
        };
        index.metric = file.metric;
        for entry in file.entries {
            let id = entry.segment.id.clone();
            index.insert(entry.segment, entry.embedding).map_err(|e| {
                RagError::Persistence(format!("entry '{id}' in {}: {e}", path.display()))
            })?;
        }

        info!(path = %path.display(), entries = index.len(), "loaded vector index");
        Ok(index)
    }
}

/// On-disk representation of a [`VectorIndex`].
#[derive(Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    dimension: usize,
    metric: SimilarityMetric,
    entries: Vec<IndexEntry>,
}
