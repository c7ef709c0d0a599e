//! Caller-side chat session
//!
//! The workflow itself is stateless; this is where conversation history
//! lives between requests. History is bounded, oldest turns drop first.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::errors::Result;
use crate::types::{Citations, ConversationTurn, ModelChoice, WorkflowOutput};
use crate::workflow::{CancelToken, Orchestrator, RequestScope, WorkflowRequest, NO_ANSWER_TEXT};

/// Turns kept by default (user and assistant each count as one)
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Answer text as shown to the user: fallback for empty answers, then
/// a sources list when there are citations.
pub fn render_answer(answer: &str, citations: &Citations) -> String {
    let mut rendered = if answer.trim().is_empty() {
        NO_ANSWER_TEXT.to_string()
    } else {
        answer.to_string()
    };

    if !citations.is_empty() {
        rendered.push_str("\n\n**Sources:**\n");
        let lines: Vec<String> = citations.iter().map(|c| format!("• {}", c)).collect();
        rendered.push_str(&lines.join("\n"));
    }

    rendered
}

/// Cancels whatever request the session currently has in flight
#[derive(Clone, Default)]
pub struct SessionCanceller {
    current: Arc<Mutex<CancelToken>>,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        self.token().cancel();
    }

    fn token(&self) -> CancelToken {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn fresh(&self) -> CancelToken {
        let token = CancelToken::new();
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token.clone();
        token
    }
}

/// Result of one `ask`
#[derive(Debug, Clone)]
pub struct SessionReply {
    pub output: WorkflowOutput,
    /// What was appended to history as the assistant turn
    pub rendered: String,
    pub scope: RequestScope,
}

/// One user's conversation with the document assistant
pub struct ChatSession {
    orchestrator: Arc<Orchestrator>,
    history: VecDeque<ConversationTurn>,
    max_turns: usize,
    model_choice: ModelChoice,
    canceller: SessionCanceller,
}

impl ChatSession {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self::with_capacity(orchestrator, DEFAULT_MAX_TURNS)
    }

    pub fn with_capacity(orchestrator: Arc<Orchestrator>, max_turns: usize) -> Self {
        Self {
            orchestrator,
            history: VecDeque::with_capacity(max_turns),
            max_turns,
            model_choice: ModelChoice::default(),
            canceller: SessionCanceller::default(),
        }
    }

    pub fn model_choice(&self) -> ModelChoice {
        self.model_choice
    }

    pub fn set_model_choice(&mut self, choice: ModelChoice) {
        self.model_choice = choice;
    }

    pub fn history(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Handle that can cancel the in-flight request from another task
    pub fn canceller(&self) -> SessionCanceller {
        self.canceller.clone()
    }

    /// Ask a question with the current history as context.
    ///
    /// History is only updated when the request completes; a cancelled
    /// request leaves it untouched.
    pub async fn ask(&mut self, question: &str) -> Result<SessionReply> {
        let request = WorkflowRequest::new(question)
            .with_history(self.history.iter().cloned().collect())
            .with_model(self.model_choice);

        let scope = RequestScope::new(self.canceller.fresh());
        let output = self.orchestrator.run_with_scope(request, &scope).await?;
        let rendered = render_answer(&output.answer, &output.citations);

        self.push(ConversationTurn::user(question));
        self.push(ConversationTurn::assistant(rendered.clone()));

        Ok(SessionReply {
            output,
            rendered,
            scope,
        })
    }

    /// Forget the conversation and abandon any in-flight request
    pub fn reset(&mut self) {
        self.canceller.cancel();
        self.history.clear();
        debug!("session reset");
    }

    fn push(&mut self, turn: ConversationTurn) {
        if self.max_turns == 0 {
            return;
        }
        while self.history.len() >= self.max_turns {
            self.history.pop_front();
        }
        self.history.push_back(turn);
    }
}
