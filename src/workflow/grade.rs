//! Context relevance grading and the retry limit

use tracing::info;

use crate::errors::Result;
use crate::llm::{GenerateOptions, LlmRouter};
use crate::types::{GradeAction, ModelChoice};
use crate::workflow::RequestScope;

const SYSTEM_PROMPT: &str = "You are a grader assessing the relevance of a retrieved context to a user question. \
If the context contains information relevant to the question, respond with only the word 'yes'. \
Otherwise, respond with only the word 'no'.";

const GRADE_MAX_TOKENS: u32 = 10;

/// Decides whether to answer, retry with a rewritten question, or give up
#[derive(Clone)]
pub struct ContextGrader {
    llm: LlmRouter,
    max_rewrites: u32,
}

impl ContextGrader {
    pub fn new(llm: LlmRouter, max_rewrites: u32) -> Self {
        Self { llm, max_rewrites }
    }

    pub fn max_rewrites(&self) -> u32 {
        self.max_rewrites
    }

    /// Checks run in order: retry limit, empty context, then the model's verdict.
    pub async fn grade(
        &self,
        scope: &RequestScope,
        context: &str,
        question: &str,
        choice: ModelChoice,
        rewrite_count: u32,
    ) -> Result<GradeAction> {
        if rewrite_count > self.max_rewrites {
            info!(rewrite_count, max_rewrites = self.max_rewrites, "rewrite limit reached");
            return Ok(GradeAction::GiveUp);
        }

        if context.is_empty() {
            info!(rewrite_count, "empty context, rewriting");
            return Ok(GradeAction::Rewrite);
        }

        let user_prompt = format!(
            "Retrieved Context:\n{}\n\nQuestion: {}\nIs the context relevant to the question? (yes/no):",
            context, question
        );
        let verdict = self
            .llm
            .generate(
                scope,
                "grade",
                choice,
                SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().max_tokens(GRADE_MAX_TOKENS),
            )
            .await?;

        let action = parse_verdict(&verdict);
        info!(action = %action, rewrite_count, "context graded");
        Ok(action)
    }
}

/// Any "yes" in the reply counts as relevant
pub fn parse_verdict(verdict: &str) -> GradeAction {
    if verdict.to_lowercase().contains("yes") {
        GradeAction::Generate
    } else {
        GradeAction::Rewrite
    }
}
