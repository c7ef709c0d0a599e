//! Retrieval backend trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// One chunk returned by a nearest-neighbour query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Identifier of the source document, used as the citation
    pub source_id: String,
    pub chunk_id: String,
    pub content: String,
    /// Smaller is closer
    pub distance: f64,
}

impl RetrievedChunk {
    pub fn new(
        source_id: impl Into<String>,
        chunk_id: impl Into<String>,
        content: impl Into<String>,
        distance: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            chunk_id: chunk_id.into(),
            content: content.into(),
            distance,
        }
    }
}

/// Nearest-chunk search over the document corpus.
///
/// Results should come back in ascending distance order; the context
/// assembler sorts them again regardless.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Check whether the backend is reachable
    async fn health_check(&self) -> bool {
        true
    }
}
