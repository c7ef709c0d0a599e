//! Answer-producing nodes
//!
//! Each generator turns the context already in state into text. None of
//! them touch citations; those were fixed by the retrieval step.

use crate::errors::Result;
use crate::llm::{GenerateOptions, LlmRouter};
use crate::types::{format_chat_history, ConversationTurn, ModelChoice};
use crate::workflow::RequestScope;

/// Fixed reply for greetings
pub const GREETING_ANSWER: &str = "Hello! How can I help you with the documents today?";

/// Fixed reply when the retry loop is exhausted
pub const GIVE_UP_ANSWER: &str =
    "I'm sorry, but I was unable to find a relevant answer in the documents after several attempts.";

const ANSWER_MAX_TOKENS: u32 = 2000;
const SUMMARY_MAX_TOKENS: u32 = 1000;
const TRAINING_MAX_TOKENS: u32 = 1000;
const REFINE_TEMPERATURE: f32 = 0.5;

/// Grounded answer for a `rag_query`
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: LlmRouter,
}

impl AnswerGenerator {
    const SYSTEM_PROMPT: &'static str = "You are a helpful assistant. \
        Answer the user's question based on the provided context and chat history. \
        If the answer is not in the context, state that you could not find an answer in the provided documents.";

    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        scope: &RequestScope,
        question: &str,
        context: &str,
        history: &[ConversationTurn],
        choice: ModelChoice,
    ) -> Result<String> {
        let user_prompt = format!(
            "Context:\n{}\nChat History:\n{}\nQuestion: {}\nAnswer:",
            context,
            format_chat_history(history),
            question
        );

        self.llm
            .generate(
                scope,
                "answer",
                choice,
                Self::SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().max_tokens(ANSWER_MAX_TOKENS),
            )
            .await
    }
}

/// Summary or key-point extraction over the retrieved context
#[derive(Clone)]
pub struct Summarizer {
    llm: LlmRouter,
}

impl Summarizer {
    const SYSTEM_PROMPT: &'static str = "You are a document summarization expert.";

    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    pub async fn summarize(
        &self,
        scope: &RequestScope,
        question: &str,
        context: &str,
        choice: ModelChoice,
    ) -> Result<String> {
        let user_prompt = format!(
            "Based ONLY on the provided context, perform one of the following tasks:\n\
             - If asked for a general summary, provide one under 300 words.\n\
             - If asked to highlight specifics (e.g., workflows, roles), extract and list those key points.\n\n\
             Context:\n{}\n\nUser's Request: \"{}\"\n\nGenerate the output now.",
            context, question
        );

        self.llm
            .generate(
                scope,
                "summarize",
                choice,
                Self::SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().max_tokens(SUMMARY_MAX_TOKENS),
            )
            .await
    }
}

/// Training material in one of a fixed set of formats
#[derive(Clone)]
pub struct TrainingGenerator {
    llm: LlmRouter,
}

impl TrainingGenerator {
    const SYSTEM_PROMPT: &'static str = "You are a corporate trainer and content creator.";

    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        scope: &RequestScope,
        question: &str,
        context: &str,
        choice: ModelChoice,
    ) -> Result<String> {
        let user_prompt = format!(
            "Based on the user's request, choose the MOST appropriate format below and generate \
             the material using ONLY the provided context.\n\n\
             Context:\n{}\n\nUser's Request: \"{}\"\n\n\
             **Formats:**\n\
             - **Concise Summary**\n\
             - **Slide-worthy Bullet Points**\n\
             - **Scenario-based Quiz** (with answer key)\n\
             - **Dos and Don'ts List**\n\n\
             Generate the output now.",
            context, question
        );

        self.llm
            .generate(
                scope,
                "train",
                choice,
                Self::SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().max_tokens(TRAINING_MAX_TOKENS),
            )
            .await
    }
}

/// Polishes an existing summary; used outside the request workflow
#[derive(Clone)]
pub struct SummaryEditor {
    llm: LlmRouter,
}

impl SummaryEditor {
    const SYSTEM_PROMPT: &'static str = "You are an expert editor. Refine the following summary to improve \
        its clarity, flow, and readability, while preserving the core information.";

    pub fn new(llm: LlmRouter) -> Self {
        Self { llm }
    }

    pub async fn refine(
        &self,
        scope: &RequestScope,
        summary: &str,
        choice: ModelChoice,
    ) -> Result<String> {
        let user_prompt = format!("Please refine this summary:\n\n{}", summary);

        self.llm
            .generate(
                scope,
                "refine",
                choice,
                Self::SYSTEM_PROMPT,
                &user_prompt,
                GenerateOptions::new().temperature(REFINE_TEMPERATURE),
            )
            .await
    }
}
