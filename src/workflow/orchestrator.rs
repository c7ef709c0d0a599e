//! Request orchestrator
//!
//! Drives one request from `Classify` to a terminal node, one node at a
//! time, following the validated transition table. Backend failures never
//! stop a run; they degrade into text or empty context and the run ends
//! with an answer. Cancellation is the only error a caller sees.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::{Config, WorkflowConfig};
use crate::errors::{Result, WorkflowError};
use crate::llm::LlmRouter;
use crate::retrieval::{ContextRetriever, HttpRetriever};
use crate::telemetry::TelemetryEvent;
use crate::types::{Intent, WorkflowOutput};
use crate::workflow::compare::{ComparisonRetriever, ComparisonSynthesizer, QueryDeconstructor};
use crate::workflow::generate::{
    AnswerGenerator, Summarizer, TrainingGenerator, GIVE_UP_ANSWER, GREETING_ANSWER,
};
use crate::workflow::grade::ContextGrader;
use crate::workflow::intent::IntentClassifier;
use crate::workflow::rewrite::QuestionRewriter;
use crate::workflow::scope::{CancelToken, RequestScope};
use crate::workflow::state::{Node, Outcome, TransitionTable, WorkflowRequest, WorkflowState};

/// Answer used if a run ends without one
pub const NO_ANSWER_TEXT: &str = "I could not find an answer to your question.";

/// Runs requests through the document Q&A workflow.
///
/// Holds no per-request state; one instance serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    llm: LlmRouter,
    context: ContextRetriever,
    classifier: IntentClassifier,
    rewriter: QuestionRewriter,
    grader: ContextGrader,
    answerer: AnswerGenerator,
    summarizer: Summarizer,
    trainer: TrainingGenerator,
    deconstructor: QueryDeconstructor,
    comparison: ComparisonRetriever,
    synthesizer: ComparisonSynthesizer,
    transitions: TransitionTable,
}

impl Orchestrator {
    pub fn new(llm: LlmRouter, context: ContextRetriever, settings: &WorkflowConfig) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            classifier: IntentClassifier::new(llm.clone()),
            rewriter: QuestionRewriter::new(llm.clone()),
            grader: ContextGrader::new(llm.clone(), settings.max_rewrites),
            answerer: AnswerGenerator::new(llm.clone()),
            summarizer: Summarizer::new(llm.clone()),
            trainer: TrainingGenerator::new(llm.clone()),
            deconstructor: QueryDeconstructor::new(llm.clone()),
            comparison: ComparisonRetriever::new(context.clone(), settings.comparison_concurrency),
            synthesizer: ComparisonSynthesizer::new(llm.clone()),
            transitions: TransitionTable::standard()?,
            llm,
            context,
        })
    }

    /// Wire the HTTP backends named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = LlmRouter::from_config(config)?;
        let retriever = Arc::new(HttpRetriever::new(&config.retrieval.endpoint)?);
        let context = ContextRetriever::from_config(retriever, config);
        Self::new(llm, context, &config.workflow)
    }

    pub fn llm(&self) -> &LlmRouter {
        &self.llm
    }

    pub fn context_retriever(&self) -> &ContextRetriever {
        &self.context
    }

    /// Run one request with a fresh scope
    pub async fn run(&self, request: WorkflowRequest, cancel: CancelToken) -> Result<WorkflowOutput> {
        let scope = RequestScope::new(cancel);
        self.run_with_scope(request, &scope).await
    }

    /// Run one request inside a caller-provided scope, so the caller can
    /// read the scope's telemetry afterwards.
    pub async fn run_with_scope(
        &self,
        request: WorkflowRequest,
        scope: &RequestScope,
    ) -> Result<WorkflowOutput> {
        let span = info_span!(
            "request",
            request_id = %scope.request_id,
            model = %request.model_choice
        );

        async move {
            let started = Instant::now();
            let mut state = WorkflowState::new(request);

            match self.drive(&mut state, scope).await {
                Ok(()) => {}
                Err(WorkflowError::Cancelled) => {
                    info!("request cancelled, discarding state");
                    scope.telemetry.record(TelemetryEvent::Cancelled {
                        timestamp: Instant::now(),
                    });
                    return Err(WorkflowError::Cancelled);
                }
                Err(e) => {
                    error!(error = %e, "workflow aborted");
                    state.citations.clear();
                }
            }

            let output = WorkflowOutput {
                answer: state.take_answer().unwrap_or_else(|| NO_ANSWER_TEXT.to_string()),
                citations: state.citations,
                intent: state.intent.unwrap_or(Intent::RagQuery),
                rewrite_count: state.rewrite_count,
                duration: started.elapsed(),
            };
            info!(
                intent = %output.intent,
                rewrites = output.rewrite_count,
                sources = output.citations.len(),
                duration_ms = output.duration.as_millis() as u64,
                "request finished"
            );
            Ok(output)
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, state: &mut WorkflowState, scope: &RequestScope) -> Result<()> {
        let mut node = Node::Classify;

        loop {
            scope.check()?;
            debug!(node = node.name(), "entering node");
            scope.telemetry.record(TelemetryEvent::NodeEntered {
                node,
                timestamp: Instant::now(),
            });

            if node.is_terminal() {
                let answer = self.finish(node, state, scope).await?;
                return state.set_answer(answer);
            }

            let outcome = self.step(node, state, scope).await?;
            node = self.transitions.next(node, outcome)?;
        }
    }

    /// Run a non-terminal node and report its outcome
    async fn step(&self, node: Node, state: &mut WorkflowState, scope: &RequestScope) -> Result<Outcome> {
        let choice = state.model_choice;

        match node {
            Node::Classify => {
                let intent = self.classifier.classify(scope, &state.question, choice).await?;
                info!(intent = %intent, "request classified");
                state.intent = Some(intent);
                Ok(Outcome::Classified(intent))
            }
            Node::Rewrite => {
                let (question, count) = self
                    .rewriter
                    .rewrite(scope, &state.question, &state.chat_history, choice, state.rewrite_count)
                    .await?;
                state.question = question;
                state.rewrite_count = count;
                Ok(Outcome::Continue)
            }
            Node::Retrieve => {
                let retrieved = self.context.retrieve(scope, &state.question, choice).await?;
                state.context = retrieved.context;
                state.citations = retrieved.citations;
                Ok(Outcome::Retrieved(state.intent.unwrap_or(Intent::RagQuery)))
            }
            Node::Grade => {
                let action = self
                    .grader
                    .grade(scope, &state.context, &state.question, choice, state.rewrite_count)
                    .await?;
                Ok(Outcome::Graded(action))
            }
            Node::Deconstruct => {
                state.plan = self.deconstructor.deconstruct(scope, &state.question, choice).await?;
                Ok(Outcome::Continue)
            }
            Node::CompareRetrieve => {
                let (aggregated, citations) =
                    self.comparison.retrieve(scope, &state.plan, choice).await?;
                state.aggregated_context = aggregated;
                state.citations = citations;
                Ok(Outcome::Continue)
            }
            terminal => Err(WorkflowError::InvalidTransition {
                from: terminal.to_string(),
                to: "(none)".to_string(),
                reason: "terminal node has no outcome".to_string(),
            }),
        }
    }

    /// Run a terminal node and produce the answer
    async fn finish(&self, node: Node, state: &mut WorkflowState, scope: &RequestScope) -> Result<String> {
        let choice = state.model_choice;

        match node {
            Node::Generate => {
                self.answerer
                    .generate(scope, &state.question, &state.context, &state.chat_history, choice)
                    .await
            }
            Node::Summarize => {
                self.summarizer
                    .summarize(scope, &state.question, &state.context, choice)
                    .await
            }
            Node::Train => {
                self.trainer
                    .generate(scope, &state.question, &state.context, choice)
                    .await
            }
            Node::Synthesize => {
                self.synthesizer
                    .synthesize(scope, &state.question, &state.aggregated_context, choice)
                    .await
            }
            Node::Greet => {
                state.citations.clear();
                Ok(GREETING_ANSWER.to_string())
            }
            Node::GiveUp => {
                info!(rewrite_count = state.rewrite_count, "giving up");
                state.citations.clear();
                Ok(GIVE_UP_ANSWER.to_string())
            }
            other => Err(WorkflowError::InvalidTransition {
                from: other.to_string(),
                to: "(answer)".to_string(),
                reason: "node does not produce an answer".to_string(),
            }),
        }
    }
}
