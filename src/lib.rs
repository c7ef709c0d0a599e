//! docquery - intent-routed question answering over a document corpus
//!
//! A request is classified into one of five modes and routed through a
//! small state machine:
//!
//! - **greeting**: fixed reply, no backend calls
//! - **rag_query**: rewrite, retrieve, grade, and either answer, retry
//!   with a rewritten question, or give up
//! - **comparison**: split into sub-queries, retrieve them concurrently,
//!   synthesize one comparative answer
//! - **summarization** / **training_generation**: retrieve once and
//!   generate directly
//!
//! Language models and the vector store sit behind the `LanguageModel`
//! and `Retriever` traits. Backend failures degrade into text or empty
//! context; a run always ends with an answer unless the caller cancels it.

pub mod errors;
pub mod types;
pub mod config;
pub mod llm;
pub mod retrieval;
pub mod workflow;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{Result, WorkflowError};
pub use types::{Citations, ConversationTurn, Intent, ModelChoice, WorkflowOutput};
pub use workflow::{CancelToken, Orchestrator, WorkflowRequest};

// Caller surface
pub mod prompts;
pub mod session;
pub mod doctor;
pub mod cli;
pub mod repl;
