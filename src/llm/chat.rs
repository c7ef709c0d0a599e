//! OpenAI-compatible chat-completions backend
//!
//! Sends the system and user prompts as separate messages to
//! `POST {endpoint}` and reads `choices[0].message.content`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::errors::{Result, WorkflowError};
use crate::llm::client::{GenerateOptions, LanguageModel};

/// Transport timeout; the router applies the workflow timeout on top
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat-completions client
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: &str, model: &str, temperature: f32) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(WorkflowError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(&config.endpoint, &config.model, config.temperature)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the request body for one call
    fn build_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: options.temperature.unwrap_or(self.temperature),
            max_tokens: options.max_tokens,
            response_format: options
                .json_mode
                .then(|| json!({ "type": "json_object" })),
            chat_template_kwargs: json!({ "enable_thinking": false }),
        }
    }

    /// Models listing URL derived from the completions endpoint
    fn models_url(&self) -> String {
        let base = self
            .endpoint
            .trim_end_matches('/')
            .trim_end_matches("/chat/completions");
        format!("{}/models", base)
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        let request = self.build_request(system_prompt, user_prompt, options);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Llm(format!("Failed to decode completion: {}", e)))?;

        Ok(body.into_content())
    }

    async fn health_check(&self) -> bool {
        match self.client.get(self.models_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    chat_template_kwargs: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

impl ChatResponse {
    /// First choice's content; a missing choice or message reads as empty text
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .unwrap_or_default()
    }
}
