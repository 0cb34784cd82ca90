//! # Cancellation context passed to daemon phases.
//!
//! [`Context`] pairs a [`CancellationToken`] with an optional deadline. It is the handle
//! the [`Supervisor`](crate::Supervisor) uses to tell a daemon when to stop:
//!
//! ```text
//! caller ctx ──► child() ──► run ctx      (cancelled by the supervisor on signal)
//!
//! with_timeout(d) ──► shutdown ctx        (fresh root, done at now + d)
//! ```
//!
//! ## Rules
//! - A child is cancelled when its parent is cancelled, never the other way around.
//! - A child inherits the parent's deadline.
//! - [`Context::with_timeout`] creates an **independent** root, so cleanup is not cut short by
//!   an already-cancelled run context.
//!
//! ## Example
//! ```rust
//! use daemonic::Context;
//!
//! let root = Context::new();
//! let child = root.child();
//! root.cancel();
//! assert!(child.is_done());
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellable context with an optional deadline.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a new root context without a deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new root context that is done once `timeout` elapses.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derives a child context; cancelling `self` cancels the child.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` once the context is cancelled or its deadline has passed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns `true` if the context was cancelled explicitly (ignores the deadline).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Returns a guard that cancels this context when dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
