//! Doctor command for backend diagnostics
//!
//! Checks that both language-model backends and the retrieval service
//! answer, and that the prompt directory is usable.

use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use crate::llm::LanguageModel;
use crate::retrieval::Retriever;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Doctor diagnostics system
pub struct Doctor {
    primary: Arc<dyn LanguageModel>,
    secondary: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    prompt_dir: PathBuf,
}

impl Doctor {
    pub fn new(
        primary: Arc<dyn LanguageModel>,
        secondary: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        prompt_dir: PathBuf,
    ) -> Self {
        Self {
            primary,
            secondary,
            retriever,
            prompt_dir,
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let (primary, secondary, retrieval) = tokio::join!(
            self.primary.health_check(),
            self.secondary.health_check(),
            self.retriever.health_check()
        );

        vec![
            backend_check("Primary model", self.primary.name(), primary),
            backend_check("Secondary model", self.secondary.name(), secondary),
            HealthCheck {
                name: "Retrieval".to_string(),
                status: if retrieval {
                    HealthStatus::Pass
                } else {
                    HealthStatus::Fail("retrieval service not reachable".to_string())
                },
            },
            self.check_prompt_dir(),
        ]
    }

    fn check_prompt_dir(&self) -> HealthCheck {
        let status = if !self.prompt_dir.exists() {
            HealthStatus::Warn(format!("{} will be created on first use", self.prompt_dir.display()))
        } else {
            match std::fs::metadata(&self.prompt_dir) {
                Ok(meta) if meta.permissions().readonly() => {
                    HealthStatus::Warn(format!("{} is read-only", self.prompt_dir.display()))
                }
                Ok(meta) if meta.is_dir() => HealthStatus::Pass,
                Ok(_) => HealthStatus::Fail(format!("{} is not a directory", self.prompt_dir.display())),
                Err(e) => HealthStatus::Fail(e.to_string()),
            }
        };

        HealthCheck {
            name: "Prompt directory".to_string(),
            status,
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "docquery diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red(),
            };
            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

fn backend_check(name: &str, backend: &str, healthy: bool) -> HealthCheck {
    HealthCheck {
        name: name.to_string(),
        status: if healthy {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!("{} backend not reachable", backend))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::llm::GenerateOptions;
    use crate::retrieval::RetrievedChunk;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Model(bool);

    #[async_trait]
    impl LanguageModel for Model {
        fn name(&self) -> &str {
            "test"
        }

        async fn generate(&self, _: &str, _: &str, _: &GenerateOptions) -> Result<String> {
            Ok(String::new())
        }

        async fn health_check(&self) -> bool {
            self.0
        }
    }

    struct Store(bool);

    #[async_trait]
    impl Retriever for Store {
        async fn query(&self, _: &str, _: usize) -> Result<Vec<RetrievedChunk>> {
            Ok(Vec::new())
        }

        async fn health_check(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let dir = TempDir::new().unwrap();
        let doctor = Doctor::new(
            Arc::new(Model(true)),
            Arc::new(Model(true)),
            Arc::new(Store(true)),
            dir.path().to_path_buf(),
        );

        let checks = doctor.run_diagnostics().await;
        assert_eq!(checks.len(), 4);
        assert!(checks.iter().all(|c| c.status == HealthStatus::Pass));
        assert!(Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails() {
        let dir = TempDir::new().unwrap();
        let doctor = Doctor::new(
            Arc::new(Model(true)),
            Arc::new(Model(false)),
            Arc::new(Store(true)),
            dir.path().join("missing"),
        );

        let checks = doctor.run_diagnostics().await;
        assert!(matches!(checks[1].status, HealthStatus::Fail(_)));
        assert!(matches!(checks[3].status, HealthStatus::Warn(_)));
        assert!(!Doctor::overall_status(&checks));
    }

    #[test]
    fn test_overall_status_ignores_warnings() {
        let checks = vec![
            HealthCheck {
                name: "a".to_string(),
                status: HealthStatus::Pass,
            },
            HealthCheck {
                name: "b".to_string(),
                status: HealthStatus::Warn("slow".to_string()),
            },
        ];
        assert!(Doctor::overall_status(&checks));
    }
}
