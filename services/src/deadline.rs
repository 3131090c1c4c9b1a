//! Per-call timeout wrapper.
//!
//! Timeouts surface as a typed [`Elapsed`] value carrying the operation
//! label, never as a silently empty result.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Typed timeout failure for an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation '{op}' timed out after {after_ms} ms")]
pub struct Elapsed {
    /// Stable label of the call site (e.g. "retriever.trigram").
    pub op: &'static str,
    /// The budget that was exhausted, in milliseconds.
    pub after_ms: u64,
}

/// Runs `fut` under `budget`; logs and returns [`Elapsed`] on expiry.
pub async fn bounded<F>(op: &'static str, budget: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(out) => Ok(out),
        Err(_) => {
            let after_ms = budget.as_millis() as u64;
            warn!(op, after_ms, "outbound call exceeded its budget");
            Err(Elapsed { op, after_ms })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value_inside_budget() {
        let out = bounded("test.fast", Duration::from_secs(5), async { 7u32 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn reports_elapsed_on_expiry() {
        let fut = bounded("test.slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
        });
        let err = fut.await.unwrap_err();
        assert_eq!(err.op, "test.slow");
        assert_eq!(err.after_ms, 50);
    }
}
