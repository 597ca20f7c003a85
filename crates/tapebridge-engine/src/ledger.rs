//! Bookkeeping of in-flight requests and exactly-once completion routing.
//!
//! Every accepted request is tracked under its future id until the future
//! settles. A waiter task consumes the settlement, removes the ledger entry,
//! and invokes exactly one of the caller's completion callbacks. Daemon error
//! files keep their reported code and message; every other failure is folded
//! into the default error code with the rendered error chain as the message.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::future::{Outcome, TaskHandle};
use tapebridge_protocol::DEFAULT_ERROR_CODE;
use tapebridge_tasks::TaskError;

/// Terminal result handed to the completion callback.
pub(crate) enum SettledOutcome<T> {
    /// The task produced its value.
    Completed(T),
    /// The task failed or was cancelled.
    Failed {
        /// Error code, taken from the daemon report when one exists.
        code: i32,
        /// Human-readable failure description.
        message: String,
    },
}

/// Concurrent map of caller-supplied request id to the handle of an
/// in-flight request.
#[derive(Clone, Default)]
pub(crate) struct RequestLedger {
    map: Arc<DashMap<Uuid, Arc<dyn TaskHandle>>>,
}

impl RequestLedger {
    /// Track a future until it settles, then report exactly once.
    ///
    /// The entry is removed before `on_settled` runs, so a late cancel for
    /// the same id is a no-op rather than a second settlement.
    pub(crate) fn track<T, F>(
        &self,
        request_id: Uuid,
        handle: Arc<dyn TaskHandle>,
        receiver: oneshot::Receiver<Outcome<T>>,
        on_settled: F,
    ) where
        T: Send + 'static,
        F: FnOnce(SettledOutcome<T>) + Send + 'static,
    {
        self.map.insert(request_id, handle);
        let map = Arc::clone(&self.map);
        tokio::spawn(async move {
            let outcome = receiver.await;
            map.remove(&request_id);
            on_settled(settle(outcome));
        });
    }

    /// Cancel the request tracked under `request_id`.
    ///
    /// Returns `false` when the id is unknown, which includes requests that
    /// already settled.
    pub(crate) async fn cancel(&self, request_id: Uuid) -> bool {
        let handle = self
            .map
            .get(&request_id)
            .map(|entry| Arc::clone(entry.value()));
        let Some(handle) = handle else {
            debug!(%request_id, "cancel requested for unknown or settled request");
            return false;
        };
        handle.cancel().await
    }

    /// Cancel every in-flight request (engine shutdown).
    pub(crate) async fn cancel_all(&self) {
        let handles: Vec<_> = self
            .map
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for handle in handles {
            handle.cancel().await;
        }
    }
}

fn settle<T>(outcome: Result<Outcome<T>, oneshot::error::RecvError>) -> SettledOutcome<T> {
    match outcome {
        Ok(Outcome::Completed(value)) => SettledOutcome::Completed(value),
        Ok(Outcome::Failed(EngineError::Task(TaskError::Daemon(failure)))) => {
            SettledOutcome::Failed {
                code: failure.code,
                message: failure.message,
            }
        }
        Ok(Outcome::Failed(error)) => SettledOutcome::Failed {
            code: DEFAULT_ERROR_CODE,
            message: error.render_chain(),
        },
        Ok(Outcome::Cancelled) => SettledOutcome::Failed {
            code: DEFAULT_ERROR_CODE,
            message: "request cancelled".to_owned(),
        },
        Err(_) => SettledOutcome::Failed {
            code: DEFAULT_ERROR_CODE,
            message: "task dropped without completing".to_owned(),
        },
    }
}
