//! Language model capability
//!
//! `LanguageModel` is the seam every backend implements; `LlmRouter`
//! picks the backend for a `ModelChoice`, bounds each call with a
//! timeout and turns backend failures into degraded text so the
//! workflow keeps moving.

pub mod client;
pub mod chat;
pub mod ollama;
pub mod router;

pub use client::{GenerateOptions, LanguageModel};
pub use chat::ChatCompletionsClient;
pub use ollama::OllamaClient;
pub use router::{LlmRouter, CONNECT_ERROR_TEXT, INVALID_RESPONSE_TEXT};

use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::errors::Result;

/// Build a backend from its configuration
pub fn backend_from_config(config: &BackendConfig) -> Result<Arc<dyn LanguageModel>> {
    let backend: Arc<dyn LanguageModel> = match config.kind {
        BackendKind::ChatCompletions => Arc::new(ChatCompletionsClient::from_config(config)?),
        BackendKind::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    Ok(backend)
}
