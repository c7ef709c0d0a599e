//! Configuration management for docquery
//!
//! Provides TOML-based configuration with defaults, validation and
//! environment overrides (a `.env` file is honoured via dotenvy).
//! Location: ~/.docquery/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, WorkflowError};
use crate::types::ModelChoice;

/// Complete configuration for docquery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "BackendConfig::primary")]
    pub primary: BackendConfig,
    #[serde(default = "BackendConfig::secondary")]
    pub secondary: BackendConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Wire protocol spoken by a language-model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-compatible `/v1/chat/completions`
    ChatCompletions,
    /// Ollama `/api/generate` with a single combined prompt
    Ollama,
}

/// Language-model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub endpoint: String,
    pub model: String,
    /// Character budget for retrieved context
    pub context_limit_chars: usize,
    pub temperature: f32,
}

/// Retrieval service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    pub endpoint: String,
    /// Nearest chunks requested per query
    pub top_k: usize,
    /// Documents kept after ranking by chunk count
    pub top_documents: usize,
}

/// Upper bound for `workflow.max_rewrites`
pub const MAX_REWRITES_LIMIT: u32 = 10;

/// Orchestrator behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    pub max_rewrites: u32,
    /// Per-call timeout for LLM and retrieval calls
    pub timeout_secs: u64,
    /// Sub-retrievals in flight at once during comparison fan-out
    pub comparison_concurrency: usize,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    pub prompt_dir: String,
}

impl BackendConfig {
    fn primary() -> Self {
        Self {
            kind: BackendKind::ChatCompletions,
            endpoint: "http://127.0.0.1:8000/v1/chat/completions".to_string(),
            model: "Qwen/Qwen3-4B".to_string(),
            context_limit_chars: 16_000,
            temperature: 0.2,
        }
    }

    fn secondary() -> Self {
        Self {
            kind: BackendKind::Ollama,
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            context_limit_chars: 30_000,
            temperature: 0.2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary: BackendConfig::primary(),
            secondary: BackendConfig::secondary(),
            retrieval: RetrievalConfig::default(),
            workflow: WorkflowConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/query".to_string(),
            top_k: 25,
            top_documents: 4,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_rewrites: 1,
            timeout_secs: 120,
            comparison_concurrency: 4,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompt_dir: "~/.docquery/prompts".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate loop and concurrency bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_rewrites > MAX_REWRITES_LIMIT {
            return Err(WorkflowError::Config(format!(
                "workflow.max_rewrites must be at most {}",
                MAX_REWRITES_LIMIT
            )));
        }

        if self.timeout_secs == 0 {
            return Err(WorkflowError::Config(
                "workflow.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.comparison_concurrency == 0 {
            return Err(WorkflowError::Config(
                "workflow.comparison_concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from file or defaults, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if let Some(config_path) = path {
            Self::load_from_file(&config_path)?
        } else {
            Self::load_default()?
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| WorkflowError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".docquery").join("config.toml"))
    }

    /// Apply `DOCQUERY_*` overrides from the given lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (prefix, backend) in [
            ("DOCQUERY_PRIMARY", &mut self.primary),
            ("DOCQUERY_SECONDARY", &mut self.secondary),
        ] {
            if let Some(endpoint) = lookup(&format!("{}_ENDPOINT", prefix)) {
                backend.endpoint = endpoint;
            }
            if let Some(model) = lookup(&format!("{}_MODEL", prefix)) {
                backend.model = model;
            }
            if let Some(limit) = lookup(&format!("{}_CONTEXT_LIMIT_CHARS", prefix)) {
                backend.context_limit_chars = limit.trim().parse().map_err(|_| {
                    WorkflowError::Config(format!(
                        "{}_CONTEXT_LIMIT_CHARS must be an integer, got '{}'",
                        prefix, limit
                    ))
                })?;
            }
        }

        if let Some(endpoint) = lookup("DOCQUERY_RETRIEVAL_ENDPOINT") {
            self.retrieval.endpoint = endpoint;
        }
        if let Some(dir) = lookup("DOCQUERY_PROMPT_DIR") {
            self.paths.prompt_dir = dir;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, backend) in [("primary", &self.primary), ("secondary", &self.secondary)] {
            if backend.endpoint.trim().is_empty() {
                return Err(WorkflowError::Config(format!(
                    "{}.endpoint must not be empty",
                    name
                )));
            }
            if backend.context_limit_chars == 0 {
                return Err(WorkflowError::Config(format!(
                    "{}.context_limit_chars must be greater than 0",
                    name
                )));
            }
        }

        if self.retrieval.endpoint.trim().is_empty() {
            return Err(WorkflowError::Config(
                "retrieval.endpoint must not be empty".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.top_documents == 0 {
            return Err(WorkflowError::Config(
                "retrieval.top_k and retrieval.top_documents must be greater than 0".to_string(),
            ));
        }

        self.workflow.validate()
    }

    /// Backend settings for a model choice
    pub fn backend(&self, choice: ModelChoice) -> &BackendConfig {
        match choice {
            ModelChoice::Primary => &self.primary,
            ModelChoice::Secondary => &self.secondary,
        }
    }

    /// Context character budget for a model choice
    pub fn max_chars(&self, choice: ModelChoice) -> usize {
        self.backend(choice).context_limit_chars
    }

    /// Prompt directory with a leading `~` expanded
    pub fn prompt_dir(&self) -> PathBuf {
        expand_home(&self.paths.prompt_dir)
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| WorkflowError::Config(format!("Failed to serialize config: {}", e)))
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_chars(ModelChoice::Primary), 16_000);
        assert_eq!(config.max_chars(ModelChoice::Secondary), 30_000);
        assert_eq!(config.retrieval.top_k, 25);
        assert_eq!(config.retrieval.top_documents, 4);
        assert_eq!(config.workflow.max_rewrites, 1);
        assert_eq!(config.workflow.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = Config::default();
        config.secondary.context_limit_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_rewrites_bounded() {
        let mut config = Config::default();
        config.workflow.max_rewrites = MAX_REWRITES_LIMIT;
        assert!(config.validate().is_ok());

        config.workflow.max_rewrites = u32::MAX;
        assert!(matches!(config.validate(), Err(WorkflowError::Config(_))));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.workflow.comparison_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DOCQUERY_PRIMARY_ENDPOINT", "http://llm:9000/v1/chat/completions"),
            ("DOCQUERY_SECONDARY_CONTEXT_LIMIT_CHARS", "42000"),
            ("DOCQUERY_RETRIEVAL_ENDPOINT", "http://search:7000/query"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.primary.endpoint, "http://llm:9000/v1/chat/completions");
        assert_eq!(config.secondary.context_limit_chars, 42_000);
        assert_eq!(config.retrieval.endpoint, "http://search:7000/query");
        assert_eq!(config.primary.model, "Qwen/Qwen3-4B");
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "DOCQUERY_PRIMARY_CONTEXT_LIMIT_CHARS").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(WorkflowError::Config(_))));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[retrieval]
endpoint = "http://localhost:9999/query"
top_k = 10
top_documents = 2

[workflow]
max_rewrites = 2
timeout_secs = 30
comparison_concurrency = 2
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.workflow.max_rewrites, 2);
        assert_eq!(config.primary, Config::default().primary);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[primary]"));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/srv/prompts"), PathBuf::from("/srv/prompts"));
    }
}
