//! Wiring between settings, the OpenAI-compatible providers and the pipeline.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use hr_rag::openai::{DEFAULT_EMBEDDING_DIMENSIONS, OpenAIChatAnswerer, OpenAIEmbeddingProvider};
use hr_rag::{Answer, RagPipeline, VectorIndex};
use tracing::info;

use crate::config::Settings;

/// Where the pipeline gets its index from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Load and index a policy document.
    Document(PathBuf),
    /// Install an index written by `hr-rag index`.
    Index(PathBuf),
}

/// Build a ready pipeline for `source`.
pub async fn open(settings: &Settings, api_key: &str, source: &Source) -> Result<RagPipeline> {
    match source {
        Source::Document(path) => {
            let pipeline = pipeline(settings, api_key, settings.provider.embedding_dimensions)?;
            let report = pipeline
                .build_from_path(path)
                .await
                .with_context(|| format!("failed to index {}", path.display()))?;
            info!(
                document = %report.document_id,
                segments = report.segment_count,
                dimension = report.dimension,
                "document indexed"
            );
            Ok(pipeline)
        }
        Source::Index(path) => {
            let index = VectorIndex::load(path)
                .with_context(|| format!("failed to load index {}", path.display()))?;
            let dimensions = settings.provider.embedding_dimensions.or(index.dimension());
            let pipeline = pipeline(settings, api_key, dimensions)?;
            pipeline
                .install_index(index)
                .await
                .with_context(|| format!("index {} does not match the embedding model", path.display()))?;
            Ok(pipeline)
        }
    }
}

/// Index `document` and write the result to `output`.
pub async fn write_index(
    settings: &Settings,
    api_key: &str,
    document: &Path,
    output: &Path,
) -> Result<String> {
    let pipeline = open(settings, api_key, &Source::Document(document.to_path_buf())).await?;
    let index = pipeline.index().await?;
    index.save(output).with_context(|| format!("failed to write index {}", output.display()))?;
    Ok(format!(
        "Indexed {} segments ({} dimensions) into {}",
        index.len(),
        index.dimension().unwrap_or(0),
        output.display()
    ))
}

fn pipeline(settings: &Settings, api_key: &str, dimensions: Option<usize>) -> Result<RagPipeline> {
    let mut embedder = OpenAIEmbeddingProvider::new(api_key)?;
    let mut answerer = OpenAIChatAnswerer::new(api_key)?.with_generation(settings.generation)?;

    if let Some(base_url) = &settings.provider.base_url {
        embedder = embedder.with_base_url(base_url);
        answerer = answerer.with_base_url(base_url);
    }
    if let Some(model) = &settings.provider.embedding_model {
        embedder = embedder.with_model(model);
    }
    if let Some(dims) = dimensions.filter(|d| *d != DEFAULT_EMBEDDING_DIMENSIONS) {
        embedder = embedder.with_dimensions(dims);
    }
    if let Some(model) = &settings.provider.chat_model {
        answerer = answerer.with_model(model);
    }

    let pipeline = RagPipeline::builder()
        .config(settings.rag.clone())
        .embedding_provider(Arc::new(embedder))
        .answerer(Arc::new(answerer))
        .build()?;
    Ok(pipeline)
}

/// Format an answer for the terminal, optionally listing its sources.
pub fn render_answer(answer: &Answer, show_sources: bool) -> String {
    let mut out = answer.text.trim().to_string();
    if show_sources && !answer.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (rank, source) in answer.sources.iter().enumerate() {
            let excerpt = excerpt(&source.segment.text, 80);
            let _ = write!(
                out,
                "\n  [{}] {} (score {:.3}): {}",
                rank + 1,
                source.segment.id,
                source.score,
                excerpt
            );
        }
    }
    out
}

/// First `max_chars` characters of `text` on one line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
