//! HTTP retrieval backend
//!
//! `POST {endpoint}` with `{"query": .., "top_k": ..}`; the service
//! answers `{"chunks": [{source_id, chunk_id, content, distance}, ..]}`.
//! Idle connections are not kept between calls.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{Result, WorkflowError};
use crate::retrieval::backend::{RetrievedChunk, Retriever};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Retrieval service client
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    client: Client,
    endpoint: String,
}

impl HttpRetriever {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(WorkflowError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest { query: text, top_k })
            .send()
            .await?
            .error_for_status()?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Retrieval(format!("Failed to decode chunks: {}", e)))?;

        Ok(body.chunks)
    }

    /// Any HTTP answer counts as reachable
    async fn health_check(&self) -> bool {
        self.client
            .get(&self.endpoint)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    chunks: Vec<RetrievedChunk>,
}
