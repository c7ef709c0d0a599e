//! Ollama generate backend
//!
//! Ollama receives one combined prompt (system prompt, blank line,
//! user prompt) on `POST /api/generate` with streaming disabled.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::errors::{Result, WorkflowError};
use crate::llm::client::{GenerateOptions, LanguageModel};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Request timeout (120 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Create new Ollama client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, 0.2)
    }

    /// Create Ollama client with custom configuration
    pub fn with_config(base_url: &str, model: &str, temperature: f32) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(WorkflowError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::with_config(&config.endpoint, &config.model, config.temperature)
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> OllamaGenerateRequest {
        let mut model_options = json!({
            "temperature": options.temperature.unwrap_or(self.temperature),
        });
        if let Some(max_tokens) = options.max_tokens {
            model_options["num_predict"] = json!(max_tokens);
        }

        OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: format!("{}\n\n{}", system_prompt, user_prompt),
            stream: false,
            format: options.json_mode.then(|| "json".to_string()),
            options: Some(model_options),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = self.build_request(system_prompt, user_prompt, options);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Llm(format!("Failed to decode Ollama response: {}", e)))?;

        Ok(body.response.trim().to_string())
    }

    /// Check if Ollama is available
    async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<serde_json::Value>,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::with_config("http://localhost:11434/", "llama3.1:8b", 0.2).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.name(), "llama3.1:8b");
    }

    #[test]
    fn test_request_combines_prompts() {
        let client = OllamaClient::new().unwrap();
        let request = client.build_request(
            "You are a grader.",
            "Is it relevant?",
            &GenerateOptions::new().max_tokens(10),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["prompt"], "You are a grader.\n\nIs it relevant?");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 10);
        assert!(value.get("format").is_none());
    }

    #[test]
    fn test_json_mode_sets_format() {
        let client = OllamaClient::new().unwrap();
        let request = client.build_request("s", "u", &GenerateOptions::new().json().temperature(0.5));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["format"], "json");
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }
}
