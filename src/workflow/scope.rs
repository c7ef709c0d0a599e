//! Per-request scope: cancellation signal plus telemetry
//!
//! Every suspension point of a request (LLM call, retrieval) is raced
//! against the request's `CancelToken`, so abandoning a request aborts
//! whatever is pending instead of waiting for the backend.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::errors::{Result, WorkflowError};
use crate::telemetry::TelemetryCollector;

/// Cooperative cancellation signal shared between caller and workflow
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `future` unless cancellation wins the race
    pub async fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(WorkflowError::Cancelled),
            output = future => Ok(output),
        }
    }
}

/// Everything a node needs that is specific to one request
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: Uuid,
    pub cancel: CancelToken,
    pub telemetry: TelemetryCollector,
}

impl RequestScope {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            cancel,
            telemetry: TelemetryCollector::new(),
        }
    }

    /// Fail fast if the caller has abandoned the request
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(WorkflowError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new(CancelToken::new())
    }
}
