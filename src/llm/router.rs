//! Backend dispatch with timeout and degraded-text fallback
//!
//! Callers always get text back: a failed or timed-out call yields a
//! human-readable error string that flows downstream as ordinary model
//! output. Only cancellation is reported as an error.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{Result, WorkflowError};
use crate::llm::client::{GenerateOptions, LanguageModel};
use crate::llm::backend_from_config;
use crate::telemetry::TelemetryEvent;
use crate::types::ModelChoice;
use crate::workflow::RequestScope;

/// Text substituted when the backend is unreachable or times out
pub const CONNECT_ERROR_TEXT: &str = "Error: Could not connect to the language model.";

/// Text substituted when the backend answered with something undecodable
pub const INVALID_RESPONSE_TEXT: &str = "Error: Invalid response from the language model.";

/// Routes calls to the backend selected by `ModelChoice`
#[derive(Clone)]
pub struct LlmRouter {
    primary: Arc<dyn LanguageModel>,
    secondary: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LlmRouter {
    pub fn new(
        primary: Arc<dyn LanguageModel>,
        secondary: Arc<dyn LanguageModel>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            timeout,
        }
    }

    /// Build both HTTP backends from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            backend_from_config(&config.primary)?,
            backend_from_config(&config.secondary)?,
            config.workflow.timeout(),
        ))
    }

    /// Backend serving a model choice
    pub fn backend(&self, choice: ModelChoice) -> &Arc<dyn LanguageModel> {
        match choice {
            ModelChoice::Primary => &self.primary,
            ModelChoice::Secondary => &self.secondary,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate text; failures become degraded text, cancellation is an error.
    ///
    /// `purpose` labels the call in logs and telemetry.
    pub async fn generate(
        &self,
        scope: &RequestScope,
        purpose: &'static str,
        choice: ModelChoice,
        system_prompt: &str,
        user_prompt: &str,
        options: GenerateOptions,
    ) -> Result<String> {
        let backend = self.backend(choice);
        let started = Instant::now();

        let outcome = scope
            .cancel
            .run(tokio::time::timeout(
                self.timeout,
                backend.generate(system_prompt, user_prompt, &options),
            ))
            .await?;

        let (text, degraded) = match outcome {
            Ok(Ok(text)) => (text, false),
            Ok(Err(e)) => {
                warn!(purpose, backend = backend.name(), error = %e, "language model call failed");
                (degraded_text(&e).to_string(), true)
            }
            Err(_) => {
                warn!(
                    purpose,
                    backend = backend.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "language model call timed out"
                );
                (CONNECT_ERROR_TEXT.to_string(), true)
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(purpose, backend = backend.name(), duration_ms, degraded, "language model call finished");
        scope.telemetry.record(TelemetryEvent::LlmCall {
            purpose,
            backend: choice,
            duration_ms,
            degraded,
            timestamp: Instant::now(),
        });

        Ok(text)
    }

    /// Health of both backends, primary first
    pub async fn health_check(&self) -> (bool, bool) {
        tokio::join!(self.primary.health_check(), self.secondary.health_check())
    }
}

/// Degraded text for a backend error
fn degraded_text(error: &WorkflowError) -> &'static str {
    match error {
        WorkflowError::Http(e) if e.is_decode() => INVALID_RESPONSE_TEXT,
        WorkflowError::Http(_) | WorkflowError::Timeout { .. } | WorkflowError::Io(_) => {
            CONNECT_ERROR_TEXT
        }
        _ => INVALID_RESPONSE_TEXT,
    }
}
