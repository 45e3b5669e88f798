//! Cancellable context with deadline support
//!
//! Every blocking operation in this crate takes a [`Context`] as its first
//! argument. A context finishes either by explicit cancellation (propagated
//! to every derived child) or by its deadline passing; the two outcomes are
//! reported as distinct errors.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::trace;

use crate::error::PromiseError;

/// Propagating cancellation token with an optional deadline.
///
/// Cheap to clone; clones share the same cancellation state. Deadlines are
/// observed at wait sites, so a context past its deadline does not cancel the
/// computations waited on - abandoning a wait never stops the work.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never cancelled on its own, no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derived context, cancelled when `self` is cancelled.
    ///
    /// Cancelling the child never cancels the parent. The parent deadline is
    /// inherited.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derived context whose deadline is at most `timeout` from now.
    ///
    /// An already-tighter parent deadline wins.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(inherited) => inherited.min(candidate),
            None => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        trace!("context cancelled");
        self.token.cancel();
    }

    /// Whether this context has been cancelled (deadline expiry not included).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The deadline, if one was set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check: the error this context has already finished with.
    #[must_use]
    pub fn error(&self) -> Option<PromiseError> {
        if self.token.is_cancelled() {
            return Some(PromiseError::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            return Some(PromiseError::DeadlineExceeded);
        }
        None
    }

    /// Resolves once the context finishes, reporting how.
    ///
    /// An already-finished context resolves immediately; there is no window
    /// in which a finished context leaves a waiter blocked.
    pub async fn done(&self) -> PromiseError {
        if let Some(err) = self.error() {
            return err;
        }
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => PromiseError::Cancelled,
                () = tokio::time::sleep_until(deadline) => PromiseError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                PromiseError::Cancelled
            }
        }
    }

    /// Guard that cancels this context when dropped, unwind included.
    pub(crate) fn cancel_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
