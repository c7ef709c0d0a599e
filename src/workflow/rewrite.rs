//! Follow-up question rewriting

use tracing::{debug, info};

use crate::errors::Result;
use crate::llm::{GenerateOptions, LlmRouter};
use crate::types::{format_chat_history, ConversationTurn, ModelChoice};
use crate::workflow::RequestScope;

const SYSTEM_PROMPT: &str = "You are a question rewriting expert.";

/// Turns a follow-up into a standalone question using the chat history.
///
/// Every visit counts as a rewrite attempt, even when there is no history
/// to rewrite against; the grader's retry limit depends on that.
#[derive(Clone)]
pub struct QuestionRewriter {
    llm: LlmRouter,
}

impl QuestionRewriter {
    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    /// Returns the (possibly unchanged) question and the incremented count
    pub async fn rewrite(
        &self,
        scope: &RequestScope,
        question: &str,
        history: &[ConversationTurn],
        choice: ModelChoice,
        rewrite_count: u32,
    ) -> Result<(String, u32)> {
        let count = rewrite_count.saturating_add(1);

        if history.is_empty() {
            debug!(rewrite_count = count, "no history, question kept");
            return Ok((question.to_string(), count));
        }

        let user_prompt = format!(
            "Given the following chat history and a follow-up question, \
             rephrase the follow-up question to be a standalone question. \
             Do not answer the question, just rewrite it.\n\n\
             Chat History:\n{}\nFollow-up Question: {}\nStandalone question:",
            format_chat_history(history),
            question
        );

        let reply = self
            .llm
            .generate(scope, "rewrite", choice, SYSTEM_PROMPT, &user_prompt, GenerateOptions::new())
            .await?;

        let rewritten = reply.trim();
        let question = if rewritten.is_empty() {
            question.to_string()
        } else {
            rewritten.to_string()
        };

        info!(rewrite_count = count, question = %question, "question rewritten");
        Ok((question, count))
    }
}
