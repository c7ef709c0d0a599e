//! Per-request telemetry
//!
//! Collects typed events as a request moves through the workflow and
//! keeps running statistics the CLI can print in verbose mode.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::types::ModelChoice;
use crate::workflow::Node;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Orchestrator entered a node
    NodeEntered {
        node: Node,
        timestamp: Instant,
    },
    /// One call to a language-model backend
    LlmCall {
        purpose: &'static str,
        backend: ModelChoice,
        duration_ms: u64,
        /// The call failed and degraded text was substituted
        degraded: bool,
        timestamp: Instant,
    },
    /// One context retrieval
    Retrieval {
        query_len: usize,
        chunks: usize,
        chars: usize,
        citations: usize,
        duration_ms: u64,
        failed: bool,
        timestamp: Instant,
    },
    /// The caller abandoned the request
    Cancelled {
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub nodes_visited: usize,
    pub llm_calls: usize,
    pub llm_failures: usize,
    pub retrievals: usize,
    pub retrieval_failures: usize,
    pub chunks_used: usize,
    pub cancelled: bool,
}

/// Telemetry collector, cheap to clone and shared across fan-out tasks
#[derive(Clone, Debug)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::NodeEntered { .. } => {
                    stats.nodes_visited += 1;
                }
                TelemetryEvent::LlmCall { degraded, .. } => {
                    stats.llm_calls += 1;
                    if *degraded {
                        stats.llm_failures += 1;
                    }
                }
                TelemetryEvent::Retrieval { chunks, failed, .. } => {
                    stats.retrievals += 1;
                    stats.chunks_used += chunks;
                    if *failed {
                        stats.retrieval_failures += 1;
                    }
                }
                TelemetryEvent::Cancelled { .. } => {
                    stats.cancelled = true;
                }
            }
        }

        lock(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Nodes visited, in order
    pub fn node_path(&self) -> Vec<Node> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::NodeEntered { node, .. } => Some(*node),
                _ => None,
            })
            .collect()
    }

    /// Purposes of every LLM call made, in order
    pub fn llm_purposes(&self) -> Vec<&'static str> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::LlmCall { purpose, .. } => Some(*purpose),
                _ => None,
            })
            .collect()
    }

    /// Render a short multi-line summary
    pub fn summary(&self) -> String {
        let stats = self.get_stats();
        let path = self
            .node_path()
            .iter()
            .map(|node| node.name())
            .collect::<Vec<_>>()
            .join(" -> ");

        format!(
            "Path:        {}\nDuration:    {:.2}s\nLLM calls:   {} ({} degraded)\nRetrievals:  {} ({} failed, {} chunks)",
            path,
            self.elapsed().as_secs_f64(),
            stats.llm_calls,
            stats.llm_failures,
            stats.retrievals,
            stats.retrieval_failures,
            stats.chunks_used
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
