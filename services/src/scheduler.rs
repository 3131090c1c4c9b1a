//! Background task orchestration interface.
//!
//! Index and review tasks are idempotent on `(repo, commit)` and
//! `(repo, pr_id, head_sha)`, so a lost enqueue is safe to repeat.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("queue rejected task '{task}': {reason}")]
    Rejected { task: String, reason: String },
}

/// Asynchronous task queue boundary.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn enqueue(&self, task_name: &str, payload: Value) -> Result<(), ScheduleError>;
}

/// Accepts and drops every task. Default for single-process deployments
/// where callers run pipelines inline.
#[derive(Debug, Default)]
pub struct NullScheduler;

#[async_trait]
impl Scheduler for NullScheduler {
    async fn enqueue(&self, task_name: &str, _payload: Value) -> Result<(), ScheduleError> {
        debug!(task_name, "task enqueue ignored (null scheduler)");
        Ok(())
    }
}
