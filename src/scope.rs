//! # Concurrency Scopes
//!
//! A [`Scope`] is the structured-concurrency boundary every actor and background task lives in.
//! It pairs a hierarchical [`CancellationToken`] with a [`TaskTracker`]:
//!
//! - cancelling a scope cancels every scope derived from it with [`Scope::child`];
//! - [`Scope::shutdown`] cancels and then waits for every task spawned directly into it.
//!
//! Each actor runs in a child of its starter's scope, so a supervisor restart cancels exactly
//! the old child's scope and never the supervisor's own.

use crate::error::ActorError;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Clone, Debug, Default)]
pub struct Scope {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Scope {
    /// A new root scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that is cancelled with this one but tracks its own tasks.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this scope (or an ancestor) is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Cancels the scope and waits for every task spawned into it.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub(crate) fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, ActorError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ActorError::usage("no tokio runtime to start in"));
        }
        Ok(self.tracker.spawn(future))
    }
}
