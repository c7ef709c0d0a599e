//! Backend trait and per-call options

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Per-call generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Ask the backend for a JSON object response
    pub json_mode: bool,
    pub max_tokens: Option<u32>,
    /// Overrides the backend's configured temperature
    pub temperature: Option<f32>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// A language-model backend.
///
/// Implementations report transport and decoding problems as errors;
/// the router decides how those surface to the workflow.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String>;

    /// Check whether the backend is reachable
    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let opts = GenerateOptions::new().max_tokens(500).json();
        assert!(opts.json_mode);
        assert_eq!(opts.max_tokens, Some(500));
        assert_eq!(opts.temperature, None);

        let opts = GenerateOptions::new().temperature(0.5);
        assert_eq!(opts.temperature, Some(0.5));
        assert!(!opts.json_mode);
    }
}
