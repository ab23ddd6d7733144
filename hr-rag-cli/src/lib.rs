//! Building blocks for the `hr-rag` command: settings loading and pipeline
//! wiring against OpenAI-compatible providers.

pub mod config;
pub mod session;

pub use config::{Overrides, ProviderSettings, Settings};
pub use session::{Source, open, render_answer, write_index};
