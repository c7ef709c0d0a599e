//! Error types for docquery
//!
//! Backend adapters and stores return these errors; the workflow
//! orchestrator absorbs them into degraded answers and only ever
//! surfaces `Cancelled` to its caller.

use thiserror::Error;

/// Main error type for the docquery workflow
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// State machine transition errors
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Language model backend errors
    #[error("Language model error: {0}")]
    Llm(String),

    /// Retrieval backend errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template store errors
    #[error("Prompt store error: {0}")]
    PromptStore(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Request abandoned by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// Generic errors with context
    #[error("Workflow error: {0}")]
    Generic(String),
}

impl WorkflowError {
    /// True when the caller abandoned the request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled)
    }
}

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Convert anyhow errors to WorkflowError
impl From<anyhow::Error> for WorkflowError {
    fn from(err: anyhow::Error) -> Self {
        WorkflowError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::Timeout { duration_ms: 120_000 };
        assert!(err.to_string().contains("120000"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = WorkflowError::InvalidTransition {
            from: "Grade".to_string(),
            to: "Summarize".to_string(),
            reason: "no edge".to_string(),
        };
        assert!(err.to_string().contains("Grade"));
        assert!(err.to_string().contains("Summarize"));
    }

    #[test]
    fn test_cancelled_flag() {
        assert!(WorkflowError::Cancelled.is_cancelled());
        assert!(!WorkflowError::Llm("down".to_string()).is_cancelled());
    }

    #[test]
    fn test_from_anyhow() {
        let err: WorkflowError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, WorkflowError::Generic(ref m) if m == "boom"));
    }
}
