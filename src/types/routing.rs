//! Routing enums: backend selection, classified intent, grading verdict

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which configured language-model backend serves a request.
///
/// Each choice also selects its own context budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    #[default]
    Primary,
    Secondary,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Primary => "primary",
            ModelChoice::Secondary => "secondary",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "a" => Ok(ModelChoice::Primary),
            "secondary" | "b" => Ok(ModelChoice::Secondary),
            other => Err(format!(
                "unknown model choice '{}' (expected 'primary' or 'secondary')",
                other
            )),
        }
    }
}

/// Classified request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    RagQuery,
    Comparison,
    Summarization,
    TrainingGeneration,
}

impl Intent {
    /// Label the classifier prompt asks the model to emit
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::RagQuery => "rag_query",
            Intent::Comparison => "comparison",
            Intent::Summarization => "summarization",
            Intent::TrainingGeneration => "training_generation",
        }
    }

    /// Parse a model-emitted label. Unknown text yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "greeting" => Some(Intent::Greeting),
            "rag_query" => Some(Intent::RagQuery),
            "comparison" => Some(Intent::Comparison),
            "summarization" => Some(Intent::Summarization),
            "training_generation" => Some(Intent::TrainingGeneration),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict of the context grader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeAction {
    Generate,
    Rewrite,
    GiveUp,
}

impl fmt::Display for GradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradeAction::Generate => "generate",
            GradeAction::Rewrite => "rewrite",
            GradeAction::GiveUp => "give_up",
        };
        f.write_str(s)
    }
}
