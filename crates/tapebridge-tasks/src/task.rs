//! The seam between task state machines and scheduling strategies.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::TaskResult;

/// A task with an initiating action followed by polls for the result.
///
/// `poll` and `abort` are never invoked concurrently for the same task; the
/// owning future serializes them. `poll` performs non-idempotent filesystem
/// moves, so that exclusion is load-bearing, not an optimization.
#[async_trait]
pub trait PollingTask: Send + Sync + 'static {
    /// Result produced when the task completes.
    type Output: Send + 'static;

    /// Paths whose filesystem events indicate progress on this task.
    ///
    /// Consulted once at registration time; the set must not change over the
    /// task's lifetime.
    fn watched_paths(&self) -> Vec<PathBuf>;

    /// Initiate the task.
    async fn start(&self) -> TaskResult<()>;

    /// Check whether the task has completed.
    ///
    /// Returns `Ok(Some(result))` on completion, `Ok(None)` while still
    /// pending, and an error when the task failed terminally.
    async fn poll(&self) -> TaskResult<Option<Self::Output>>;

    /// Abort the task.
    ///
    /// Returns `Ok(true)` if the task was aborted and `Ok(false)` if it could
    /// not be, presumably because the daemon already completed it.
    async fn abort(&self) -> TaskResult<bool>;
}
