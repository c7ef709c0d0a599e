//! Final output of one workflow run

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Citations, Intent};

/// Answer returned to the caller.
///
/// Greeting and give-up terminals carry no citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub answer: String,
    pub citations: Citations,
    /// Mode the request was routed through
    pub intent: Intent,
    /// Number of rewrite-node visits
    pub rewrite_count: u32,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl WorkflowOutput {
    pub fn has_citations(&self) -> bool {
        !self.citations.is_empty()
    }

    /// Human-readable one-line summary for verbose output
    pub fn summary(&self) -> String {
        format!(
            "{} in {:.2}s ({} rewrites, {} sources)",
            self.intent,
            self.duration.as_secs_f64(),
            self.rewrite_count,
            self.citations.len()
        )
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
