//! Retrieval capability and context assembly
//!
//! Components:
//! - `Retriever`: nearest-chunk search seam implemented by backends
//! - `HttpRetriever`: JSON-over-HTTP retrieval service client
//! - `ContextRetriever`: ranks documents, applies the character budget
//!   and collects citations for one query

pub mod backend;
pub mod http;
pub mod context;

pub use backend::{RetrievedChunk, Retriever};
pub use http::HttpRetriever;
pub use context::{assemble_context, ContextBudget, ContextRetriever, RetrievedContext};
