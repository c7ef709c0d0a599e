//! Context assembly for one query
//!
//! Ranking: take the top-K nearest chunks, score each source document by
//! how many of those chunks it owns, keep the best N documents, then order
//! chunks by document rank and, within a document, by distance. Chunks are
//! appended as `Content: {chunk}\n\n` until the next one would overflow the
//! character budget; a chunk is never cut.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::Result;
use crate::retrieval::backend::{RetrievedChunk, Retriever};
use crate::telemetry::TelemetryEvent;
use crate::types::{Citations, ModelChoice};
use crate::workflow::RequestScope;

/// Character budgets per model choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub primary: usize,
    pub secondary: usize,
}

impl ContextBudget {
    pub fn max_chars(&self, choice: ModelChoice) -> usize {
        match choice {
            ModelChoice::Primary => self.primary,
            ModelChoice::Secondary => self.secondary,
        }
    }
}

/// Context blob plus the sources that went into it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub context: String,
    pub citations: Citations,
    pub chunks_used: usize,
    /// The backend failed; context and citations are empty
    pub failed: bool,
}

impl RetrievedContext {
    fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }
}

/// Turns a query into a budgeted context blob and citation set
#[derive(Clone)]
pub struct ContextRetriever {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    top_documents: usize,
    budget: ContextBudget,
    timeout: Duration,
}

impl ContextRetriever {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        top_k: usize,
        top_documents: usize,
        budget: ContextBudget,
        timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            top_k,
            top_documents,
            budget,
            timeout,
        }
    }

    pub fn from_config(retriever: Arc<dyn Retriever>, config: &Config) -> Self {
        Self::new(
            retriever,
            config.retrieval.top_k,
            config.retrieval.top_documents,
            ContextBudget {
                primary: config.max_chars(ModelChoice::Primary),
                secondary: config.max_chars(ModelChoice::Secondary),
            },
            config.workflow.timeout(),
        )
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    /// Retrieve context for `query` under the budget of `choice`.
    ///
    /// Backend failures and timeouts yield an empty, `failed` result;
    /// only cancellation is returned as an error.
    pub async fn retrieve(
        &self,
        scope: &RequestScope,
        query: &str,
        choice: ModelChoice,
    ) -> Result<RetrievedContext> {
        let started = Instant::now();
        let max_chars = self.budget.max_chars(choice);

        let outcome = scope
            .cancel
            .run(tokio::time::timeout(
                self.timeout,
                self.retriever.query(query, self.top_k),
            ))
            .await?;

        let result = match outcome {
            Ok(Ok(chunks)) => {
                let (context, citations, chunks_used) =
                    assemble_context(chunks, self.top_k, self.top_documents, max_chars);
                RetrievedContext {
                    context,
                    citations,
                    chunks_used,
                    failed: false,
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "retrieval failed, continuing with empty context");
                RetrievedContext::failed()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "retrieval timed out, continuing with empty context"
                );
                RetrievedContext::failed()
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(
            chunks = result.chunks_used,
            chars = result.context.chars().count(),
            citations = result.citations.len(),
            duration_ms,
            "context retrieved"
        );
        scope.telemetry.record(TelemetryEvent::Retrieval {
            query_len: query.chars().count(),
            chunks: result.chunks_used,
            chars: result.context.chars().count(),
            citations: result.citations.len(),
            duration_ms,
            failed: result.failed,
            timestamp: Instant::now(),
        });

        Ok(result)
    }
}

/// Rank, budget and concatenate chunks.
///
/// Returns the context, its citations and the number of chunks included.
/// The context never exceeds `max_chars` characters.
pub fn assemble_context(
    mut chunks: Vec<RetrievedChunk>,
    top_k: usize,
    top_documents: usize,
    max_chars: usize,
) -> (String, Citations, usize) {
    chunks.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    chunks.truncate(top_k);

    let ranked = rank_documents(&chunks, top_documents);

    let mut selected: Vec<(usize, &RetrievedChunk)> = chunks
        .iter()
        .filter_map(|chunk| ranked.get(chunk.source_id.as_str()).map(|rank| (*rank, chunk)))
        .collect();
    // Stable sort keeps ascending distance inside each document.
    selected.sort_by_key(|(rank, _)| *rank);

    let mut context = String::new();
    let mut citations = Citations::new();
    let mut current_chars = 0;
    let mut used = 0;

    for (_, chunk) in selected {
        let part = format!("Content: {}\n\n", chunk.content);
        let part_chars = part.chars().count();
        if current_chars + part_chars > max_chars {
            break;
        }
        context.push_str(&part);
        current_chars += part_chars;
        citations.insert(chunk.source_id.as_str());
        used += 1;
    }

    (context, citations, used)
}

/// Map source id -> rank position (0 is best) for the kept documents.
///
/// Documents are ordered by chunk count descending; ties go to the
/// document with the closer best chunk, then to first appearance.
fn rank_documents(chunks: &[RetrievedChunk], top_documents: usize) -> HashMap<&str, usize> {
    struct DocScore<'a> {
        source_id: &'a str,
        count: usize,
        first_seen: usize,
    }

    let mut scores: Vec<DocScore<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    // Chunks are distance-sorted, so first appearance is also the closest chunk.
    for (position, chunk) in chunks.iter().enumerate() {
        let existing = index.get(chunk.source_id.as_str()).copied();
        match existing {
            Some(slot) => scores[slot].count += 1,
            None => {
                index.insert(chunk.source_id.as_str(), scores.len());
                scores.push(DocScore {
                    source_id: chunk.source_id.as_str(),
                    count: 1,
                    first_seen: position,
                });
            }
        }
    }

    scores.sort_by(|a, b| b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen)));

    scores
        .into_iter()
        .take(top_documents)
        .enumerate()
        .map(|(rank, score)| (score.source_id, rank))
        .collect()
}
