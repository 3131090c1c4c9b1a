//! Cooperative cancellation primitives.
//!
//! A [`CancelSource`] lives at the request boundary; every outbound call
//! observes a cloned [`CancelToken`]. Dropping the source counts as
//! cancellation: a request that no longer exists must not keep work alive.

use std::sync::OnceLock;

use tokio::sync::watch;

/// Error value returned by operations that stopped because the request
/// boundary asked them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Owning side of a cancellation channel. Held by the request handler.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    /// Creates a fresh, not-yet-cancelled source.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a token observing this source.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Signals cancellation to every outstanding token.
    pub fn cancel(&self) {
        // Send only fails when no receiver is left, which is fine.
        let _ = self.tx.send(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap, cloneable observer of a [`CancelSource`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires. Useful for callers without a request boundary.
    pub fn never() -> Self {
        static NEVER: OnceLock<watch::Sender<bool>> = OnceLock::new();
        let tx = NEVER.get_or_init(|| watch::channel(false).0);
        Self { rx: tx.subscribe() }
    }

    /// True once cancellation was requested or the source was dropped.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves when cancellation is requested (or the source is dropped).
    /// Pends forever on a [`CancelToken::never`] token.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Source dropped without an explicit cancel. The `never`
                // token is backed by a static sender and cannot get here.
                return;
            }
        }
    }

    /// Returns `Err(Cancelled)` if the token already fired.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
