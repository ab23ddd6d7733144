//! Settings file for the `hr-rag` command.
//!
//! ```toml
//! [rag]
//! chunk_size = 100
//! chunk_overlap = 10
//! top_k = 4
//! answer_timeout = 30.0
//!
//! [generation]
//! max_output_tokens = 3000
//! temperature = 0.1
//! top_p = 0.9
//!
//! [provider]
//! base_url = "https://api.openai.com/v1"
//! embedding_model = "text-embedding-3-small"
//! chat_model = "gpt-4o-mini"
//! ```
//!
//! Every section and key is optional. Command-line flags are layered on top
//! with [`Settings::apply`].

use std::path::Path;

use anyhow::{Context, Result};
use hr_rag::{GenerationConfig, RagConfig};
use serde::Deserialize;

/// Connection details for the OpenAI-compatible service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
    pub embedding_model: Option<String>,
    /// Required when `embedding_model` does not produce the default size.
    pub embedding_dimensions: Option<usize>,
    pub chat_model: Option<String>,
}

/// Everything the command needs apart from the API key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rag: RagConfig,
    pub generation: GenerationConfig,
    pub provider: ProviderSettings,
}

/// Values given on the command line. `None` keeps the file (or default) value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub embedding_model: Option<String>,
    pub chat_model: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub top_k: Option<usize>,
}

impl Settings {
    /// Read settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse settings from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load the file at `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Layer command-line values over the current settings.
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(base_url) = overrides.base_url {
            self.provider.base_url = Some(base_url);
        }
        if let Some(model) = overrides.embedding_model {
            self.provider.embedding_model = Some(model);
        }
        if let Some(model) = overrides.chat_model {
            self.provider.chat_model = Some(model);
        }
        if let Some(size) = overrides.chunk_size {
            self.rag.chunk_size = size;
        }
        if let Some(overlap) = overrides.chunk_overlap {
            self.rag.chunk_overlap = overlap;
        }
        if let Some(k) = overrides.top_k {
            self.rag.top_k = k;
        }
        self
    }

    /// Reject inconsistent values before any provider is contacted.
    pub fn validate(&self) -> Result<()> {
        self.rag.validate().context("invalid [rag] settings")?;
        self.generation.validate().context("invalid [generation] settings")?;
        if self.provider.embedding_dimensions == Some(0) {
            anyhow::bail!("invalid [provider] settings: embedding_dimensions must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.rag.chunk_size, 100);
        assert_eq!(settings.generation.max_output_tokens, 3000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [rag]
            chunk_size = 500
            answer_timeout = 1.5

            [provider]
            chat_model = "llama3"
            "#,
        )
        .unwrap();

        assert_eq!(settings.rag.chunk_size, 500);
        assert_eq!(settings.rag.chunk_overlap, 10);
        assert_eq!(settings.rag.answer_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.provider.chat_model.as_deref(), Some("llama3"));
        assert_eq!(settings.provider.base_url, None);
        assert_eq!(settings.generation, GenerationConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::from_toml("[provider]\nmodel = \"x\"\n").is_err());
        assert!(Settings::from_toml("[rag]\nchunk_overlp = 5\n").is_err());
        assert!(Settings::from_toml("[generation]\ntemprature = 0.5\n").is_err());
    }

    #[test]
    fn oversized_timeout_is_a_parse_error() {
        assert!(Settings::from_toml("[rag]\nanswer_timeout = 1e30\n").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let settings = Settings::from_toml("[rag]\ntop_k = 8\n[provider]\nchat_model = \"a\"\n")
            .unwrap()
            .apply(Overrides {
                chat_model: Some("b".to_string()),
                chunk_size: Some(40),
                chunk_overlap: Some(5),
                ..Overrides::default()
            });

        assert_eq!(settings.provider.chat_model.as_deref(), Some("b"));
        assert_eq!(settings.rag.chunk_size, 40);
        assert_eq!(settings.rag.chunk_overlap, 5);
        assert_eq!(settings.rag.top_k, 8);
    }

    #[test]
    fn validate_catches_bad_values() {
        let overlapping = Settings::default()
            .apply(Overrides { chunk_size: Some(10), chunk_overlap: Some(10), ..Overrides::default() });
        assert!(overlapping.validate().is_err());

        let hot = Settings::from_toml("[generation]\ntemperature = 1.5\n").unwrap();
        assert!(hot.validate().is_err());

        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Settings::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
