//! OpenAI-compatible embedding and chat-completion providers.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! providers speak the OpenAI REST API directly via `reqwest`, so any
//! compatible endpoint (Azure-style gateways, vLLM, Ollama) can be targeted
//! with `with_base_url`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::answerer::{Answerer, build_context, build_prompt};
use crate::config::GenerationConfig;
use crate::document::Segment;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Largest `input` array the embeddings endpoint accepts in one request.
pub const MAX_BATCH_INPUTS: usize = 2048;

/// The default model for answers.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

fn read_api_key() -> std::result::Result<String, String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| "OPENAI_API_KEY environment variable not set".to_string())
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

/// Pull the `error.message` field out of an OpenAI error body, if present.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
/// - `base_url` – defaults to [`OPENAI_API_BASE`].
///
/// # Example
///
/// ```rust,ignore
/// use hr_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("parental leave").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::embedding("OpenAI", "API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = read_api_key().map_err(|m| RagError::embedding("OpenAI", m))?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    ///
    /// Call [`with_dimensions`](Self::with_dimensions) as well when the model's
    /// native size differs from the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Target a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("OpenAI", "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in input_batches(texts) {
            embeddings.extend(self.request_embeddings(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

/// Split inputs into request-sized batches, preserving order.
fn input_batches<'a, 't>(texts: &'a [&'t str]) -> std::slice::Chunks<'a, &'t str> {
    texts.chunks(MAX_BATCH_INPUTS)
}

impl OpenAIEmbeddingProvider {
    /// One `/embeddings` call for at most [`MAX_BATCH_INPUTS`] texts.
    async fn request_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(provider = "OpenAI", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                RagError::embedding("OpenAI", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "OpenAI", %status, "API error");
            return Err(RagError::embedding(
                "OpenAI",
                format!("API returned {status}: {}", error_detail(body)),
            ));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            RagError::embedding("OpenAI", format!("failed to parse response: {e}"))
        })?;

        order_embeddings(embedding_response.data, texts.len())
    }
}

/// Put embeddings back in request order and check none are missing.
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(RagError::embedding(
            "OpenAI",
            format!("API returned {} embeddings for {expected} inputs", data.len()),
        ));
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

// ── Chat completions ───────────────────────────────────────────────

/// An [`Answerer`] backed by the OpenAI chat completions API.
///
/// Sends the rendered prompt as a single user message together with the
/// sampling parameters from [`GenerationConfig`].
///
/// # Example
///
/// ```rust,ignore
/// use hr_rag::openai::OpenAIChatAnswerer;
///
/// let answerer = OpenAIChatAnswerer::from_env()?.with_model("gpt-4o");
/// ```
pub struct OpenAIChatAnswerer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    generation: GenerationConfig,
}

impl OpenAIChatAnswerer {
    /// Create a new answerer with the given API key and default generation settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::answerer("OpenAI", "API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            generation: GenerationConfig::default(),
        })
    }

    /// Create a new answerer using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = read_api_key().map_err(|m| RagError::answerer("OpenAI", m))?;
        Self::new(api_key)
    }

    /// Set the chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Target a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the sampling parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the configuration is out of range.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Result<Self> {
        generation.validate()?;
        self.generation = generation;
        Ok(self)
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.generation.max_output_tokens,
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
        }
    }
}

#[async_trait]
impl Answerer for OpenAIChatAnswerer {
    async fn answer(&self, question: &str, context: &[Segment]) -> Result<String> {
        let prompt = build_prompt(question, &build_context(context));
        debug!(
            provider = "OpenAI",
            model = %self.model,
            context_segments = context.len(),
            prompt_len = prompt.len(),
            "requesting completion"
        );

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.request(&prompt))
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                RagError::answerer("OpenAI", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "OpenAI", %status, "API error");
            return Err(RagError::answerer(
                "OpenAI",
                format!("API returned {status}: {}", error_detail(body)),
            ));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            RagError::answerer("OpenAI", format!("failed to parse response: {e}"))
        })?;

        first_reply(chat)
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

fn first_reply(chat: ChatResponse) -> Result<String> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| RagError::answerer("OpenAI", "API returned no answer text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_keys_are_rejected() {
        assert!(matches!(
            OpenAIEmbeddingProvider::new(""),
            Err(RagError::EmbeddingUnavailable { .. })
        ));
        assert!(matches!(OpenAIChatAnswerer::new(""), Err(RagError::AnswererUnavailable { .. })));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(endpoint("http://localhost:11434/v1/", "embeddings"), "http://localhost:11434/v1/embeddings");
        assert_eq!(endpoint(OPENAI_API_BASE, "chat/completions"), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn chat_request_carries_generation_settings() {
        let answerer = OpenAIChatAnswerer::new("sk-test")
            .unwrap()
            .with_generation(GenerationConfig { max_output_tokens: 256, temperature: 0.2, top_p: 0.5 })
            .unwrap();
        let body = serde_json::to_value(answerer.request("hi")).unwrap();
        assert_eq!(body["model"], DEFAULT_CHAT_MODEL);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn out_of_range_generation_is_rejected() {
        let result = OpenAIChatAnswerer::new("sk-test")
            .unwrap()
            .with_generation(GenerationConfig { max_output_tokens: 10, temperature: 2.0, top_p: 0.5 });
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let data: Vec<EmbeddingData> = serde_json::from_str(
            r#"[{"index": 1, "embedding": [0.0, 1.0]}, {"index": 0, "embedding": [1.0, 0.0]}]"#,
        )
        .unwrap();
        let ordered = order_embeddings(data, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn large_inputs_are_split_into_ordered_batches() {
        let texts: Vec<String> = (0..2 * MAX_BATCH_INPUTS + 1).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let batches: Vec<&[&str]> = input_batches(&refs).collect();
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![MAX_BATCH_INPUTS, MAX_BATCH_INPUTS, 1]);
        assert_eq!(batches.concat(), refs);

        assert_eq!(input_batches(&[] as &[&str]).count(), 0);
        assert_eq!(input_batches(&["one"] as &[&str]).count(), 1);
    }

    #[test]
    fn missing_embeddings_are_an_error() {
        let data: Vec<EmbeddingData> =
            serde_json::from_str(r#"[{"index": 0, "embedding": [1.0]}]"#).unwrap();
        assert!(matches!(order_embeddings(data, 2), Err(RagError::EmbeddingUnavailable { .. })));
    }

    #[test]
    fn empty_reply_is_an_error() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "  "}}]}"#).unwrap();
        assert!(matches!(first_reply(chat), Err(RagError::AnswererUnavailable { .. })));

        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "10 days"}}]}"#).unwrap();
        assert_eq!(first_reply(chat).unwrap(), "10 days");
    }

    #[test]
    fn error_detail_prefers_api_message() {
        let body = r#"{"error": {"message": "invalid api key"}}"#.to_string();
        assert_eq!(error_detail(body), "invalid api key");
        assert_eq!(error_detail("gateway timeout".to_string()), "gateway timeout");
    }
}
