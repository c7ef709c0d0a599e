//! Document Q&A workflow
//!
//! Components:
//! - `state`: nodes, the transition table and per-request state
//! - `scope`: cancellation token and per-request telemetry
//! - `intent`, `rewrite`, `grade`, `generate`, `compare`: node logic
//! - `orchestrator`: runs a request through the nodes

pub mod state;
pub mod scope;
pub mod intent;
pub mod rewrite;
pub mod grade;
pub mod generate;
pub mod compare;
pub mod orchestrator;

pub use state::{AggregatedContext, Node, Outcome, TransitionTable, WorkflowRequest, WorkflowState};
pub use scope::{CancelToken, RequestScope};
pub use intent::{IntentClassifier, IntentRules};
pub use rewrite::QuestionRewriter;
pub use grade::ContextGrader;
pub use generate::{
    AnswerGenerator, Summarizer, SummaryEditor, TrainingGenerator, GIVE_UP_ANSWER, GREETING_ANSWER,
};
pub use compare::{
    ComparisonRetriever, ComparisonSynthesizer, QueryDeconstructor, NO_COMPARABLE_DATA_ANSWER,
};
pub use orchestrator::{Orchestrator, NO_ANSWER_TEXT};

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::errors::Result;
    use crate::llm::{GenerateOptions, LanguageModel, LlmRouter};

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub system: String,
        pub user: String,
        pub options: GenerateOptions,
    }

    /// Replies from a fixed script, then empty strings
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedModel {
        pub fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, system: &str, user: &str, options: &GenerateOptions) -> Result<String> {
            self.calls.lock().unwrap().push(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
                options: options.clone(),
            });
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    /// Router with the same scripted model behind both choices
    pub fn router(model: Arc<ScriptedModel>) -> LlmRouter {
        LlmRouter::new(model.clone(), model, Duration::from_secs(5))
    }
}
