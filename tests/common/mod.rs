//! In-process fakes for the language-model and retrieval seams

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docquery::config::WorkflowConfig;
use docquery::errors::{Result, WorkflowError};
use docquery::llm::{GenerateOptions, LanguageModel, LlmRouter};
use docquery::retrieval::{ContextBudget, ContextRetriever, RetrievedChunk, Retriever};
use docquery::workflow::Orchestrator;

#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
    pub options: GenerateOptions,
}

type Reply = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Model whose reply is computed from the prompts
pub struct FakeModel {
    reply: Reply,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl FakeModel {
    pub fn new(reply: impl Fn(&str, &str) -> String + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Never answers within any reasonable timeout
    pub fn stalled() -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(|_, _| "late".to_string()),
            delay: Some(Duration::from_secs(300)),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Reply chosen by which node is calling, keyed on the system prompt
    pub fn by_role(replies: &[(&str, &str)]) -> Arc<Self> {
        let replies: Vec<(String, String)> = replies
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::new(move |system, _| {
            replies
                .iter()
                .find(|(key, _)| system.contains(key.as_str()))
                .map(|(_, reply)| reply.clone())
                .unwrap_or_default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, system_fragment: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.system.contains(system_fragment))
            .collect()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, system: &str, user: &str, options: &GenerateOptions) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            system: system.to_string(),
            user: user.to_string(),
            options: options.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok((self.reply)(system, user))
    }
}

/// Model that always fails at the transport level
pub struct DownModel;

#[async_trait]
impl LanguageModel for DownModel {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _: &str, _: &str, _: &GenerateOptions) -> Result<String> {
        Err(WorkflowError::Timeout { duration_ms: 120_000 })
    }
}

/// Retriever answering from a fixed table of query -> chunks
#[derive(Default)]
pub struct FakeRetriever {
    results: HashMap<String, Vec<RetrievedChunk>>,
    delays: HashMap<String, Duration>,
    fallback: Vec<RetrievedChunk>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same chunks for every query
    pub fn always(chunks: Vec<RetrievedChunk>) -> Self {
        Self {
            fallback: chunks,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, query: &str, chunks: Vec<RetrievedChunk>) -> Self {
        self.results.insert(query.to_string(), chunks);
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        self.queries.lock().unwrap().push(text.to_string());
        if let Some(delay) = self.delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail {
            return Err(WorkflowError::Retrieval("connection refused".to_string()));
        }
        let chunks = self.results.get(text).unwrap_or(&self.fallback);
        Ok(chunks.iter().take(top_k).cloned().collect())
    }
}

pub fn chunk(source: &str, content: &str, distance: f64) -> RetrievedChunk {
    RetrievedChunk::new(source, format!("{}-{}", source, distance), content, distance)
}

pub fn budget() -> ContextBudget {
    ContextBudget {
        primary: 16_000,
        secondary: 30_000,
    }
}

pub fn context_retriever(retriever: Arc<FakeRetriever>) -> ContextRetriever {
    ContextRetriever::new(retriever, 25, 4, budget(), Duration::from_secs(5))
}

/// Orchestrator over one model for both choices
pub fn orchestrator(model: Arc<dyn LanguageModel>, retriever: Arc<FakeRetriever>) -> Orchestrator {
    orchestrator_with(model, retriever, WorkflowConfig::default())
}

pub fn orchestrator_with(
    model: Arc<dyn LanguageModel>,
    retriever: Arc<FakeRetriever>,
    settings: WorkflowConfig,
) -> Orchestrator {
    let llm = LlmRouter::new(model.clone(), model, Duration::from_secs(5));
    Orchestrator::new(llm, context_retriever(retriever), &settings).unwrap()
}

/// System prompt fragments identifying each node
pub const CLASSIFY: &str = "intent classification expert";
pub const REWRITE: &str = "question rewriting expert";
pub const GRADE: &str = "grader assessing the relevance";
pub const ANSWER: &str = "You are a helpful assistant";
pub const DECONSTRUCT: &str = "deconstructing comparison questions";
pub const SYNTHESIZE: &str = "expert analyst";
pub const SUMMARIZE: &str = "document summarization expert";
pub const TRAIN: &str = "corporate trainer";
