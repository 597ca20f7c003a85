//! The cancellable promise binding a task to its triggering mechanism.
//!
//! # Design
//!
//! - One future owns exactly one task; the task never outlives the future.
//! - A `tokio::sync::Mutex` gate serializes `poll`, `abort`, and `cancel`
//!   for a given future: `poll` performs non-idempotent filesystem moves.
//! - Terminal outcomes leave through a oneshot consumed by the ledger's
//!   waiter task, so resolution fires exactly once on every exit path.
//! - Registry unregistration happens inside the gate, in the same critical
//!   section as the state change: no observer sees a settled future that is
//!   still registered.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tapebridge_tasks::PollingTask;
use tokio::sync::{Mutex, Notify, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::registry::WatchRegistry;

/// Terminal outcome of a task future.
pub(crate) enum Outcome<T> {
    /// The task produced its result.
    Completed(T),
    /// The task failed terminally.
    Failed(EngineError),
    /// The task was cancelled before completing.
    Cancelled,
}

/// Type-erased view of a task future, as stored in the ledger and registry.
#[async_trait]
pub(crate) trait TaskHandle: Send + Sync + 'static {
    /// Identity of the future, used to match registry entries.
    fn future_id(&self) -> Uuid;

    /// Drive the task one step if it is still pending.
    async fn poll_now(&self);

    /// Cooperatively cancel the task; `false` when the task refused.
    async fn cancel(&self) -> bool;
}

struct Gate<T> {
    sender: Option<oneshot::Sender<Outcome<T>>>,
}

struct Shared<T: Send + 'static> {
    id: Uuid,
    task: Box<dyn PollingTask<Output = T>>,
    gate: Mutex<Gate<T>>,
    done: AtomicBool,
    done_signal: Notify,
    registry: Option<WatchRegistry>,
}

/// The future result of a [`PollingTask`].
///
/// Cloning shares the underlying state; all clones settle together.
pub(crate) struct TaskFuture<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> TaskFuture<T> {
    /// Wrap a task, returning the future and the receiver its terminal
    /// outcome will be delivered on.
    pub(crate) fn new(
        task: Box<dyn PollingTask<Output = T>>,
        registry: Option<WatchRegistry>,
    ) -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (sender, receiver) = oneshot::channel();
        let future = Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                task,
                gate: Mutex::new(Gate {
                    sender: Some(sender),
                }),
                done: AtomicBool::new(false),
                done_signal: Notify::new(),
                registry,
            }),
        };
        (future, receiver)
    }

    pub(crate) fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Paths the owned task wants watched.
    pub(crate) fn watched_paths(&self) -> Vec<PathBuf> {
        self.shared.task.watched_paths()
    }

    /// Initiate the owned task.
    pub(crate) async fn start_task(&self) -> EngineResult<()> {
        self.shared.task.start().await?;
        Ok(())
    }

    /// Whether the future has settled.
    pub(crate) fn is_done(&self) -> bool {
        self.shared.done.load(Ordering::Acquire)
    }

    /// Wait until the future settles. Used by the timer loop for prompt
    /// exit on cancellation.
    pub(crate) async fn settled(&self) {
        self.shared.done_signal.notified().await;
    }

    /// Fail the future from outside the poll path (dispatch or registration
    /// errors). No-op once settled.
    pub(crate) async fn fail(&self, error: EngineError) {
        let mut gate = self.shared.gate.lock().await;
        if gate.sender.is_some() {
            self.settle(&mut gate, Outcome::Failed(error));
        }
    }

    /// Poll the task once, settling the future on completion or failure.
    pub(crate) async fn poll_task(&self) {
        let mut gate = self.shared.gate.lock().await;
        if gate.sender.is_none() {
            return;
        }
        match self.shared.task.poll().await {
            Ok(Some(result)) => {
                debug!(future_id = %self.shared.id, "task resolved");
                self.settle(&mut gate, Outcome::Completed(result));
            }
            Ok(None) => {}
            Err(error) => {
                // Best-effort abort; a secondary failure must not mask the
                // poll error.
                if let Err(suppressed) = self.shared.task.abort().await {
                    warn!(
                        future_id = %self.shared.id,
                        error = %suppressed,
                        "abort after poll failure also failed"
                    );
                }
                self.settle(&mut gate, Outcome::Failed(error.into()));
            }
        }
    }

    /// Cancel the future, aborting the task first.
    ///
    /// Holding the gate across `abort` closes the race where the daemon
    /// completes the operation concurrently with the cancellation: whichever
    /// side wins the gate settles the future, the other observes it settled.
    pub(crate) async fn cancel_task(&self) -> bool {
        let mut gate = self.shared.gate.lock().await;
        if gate.sender.is_none() {
            return false;
        }
        match self.shared.task.abort().await {
            Ok(true) => {
                self.settle(&mut gate, Outcome::Cancelled);
                true
            }
            Ok(false) => false,
            Err(error) => {
                self.settle(&mut gate, Outcome::Failed(error.into()));
                true
            }
        }
    }

    /// Settle the future. Caller holds the gate and has checked pending.
    fn settle(&self, gate: &mut Gate<T>, outcome: Outcome<T>) {
        if let Some(registry) = &self.shared.registry {
            registry.unregister(self.shared.id, &self.shared.task.watched_paths());
        }
        self.shared.done.store(true, Ordering::Release);
        self.shared.done_signal.notify_one();
        if let Some(sender) = gate.sender.take() {
            // The ledger waiter may already be gone at shutdown.
            let _ = sender.send(outcome);
        }
    }
}

#[async_trait]
impl<T: Send + 'static> TaskHandle for TaskFuture<T> {
    fn future_id(&self) -> Uuid {
        self.id()
    }

    async fn poll_now(&self) {
        self.poll_task().await;
    }

    async fn cancel(&self) -> bool {
        self.cancel_task().await
    }
}

/// Drive a future with fixed-interval polling until it settles.
pub(crate) fn spawn_poll_loop<T: Send + 'static>(future: TaskFuture<T>, period: Duration) {
    tokio::spawn(async move {
        loop {
            if future.is_done() {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(period) => {}
                () = future.settled() => break,
            }
            future.poll_task().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tapebridge_tasks::TaskResult;

    struct CountingTask {
        polls_until_done: usize,
        polls: AtomicUsize,
        abortable: bool,
        aborts: AtomicUsize,
    }

    #[async_trait]
    impl PollingTask for CountingTask {
        type Output = u32;

        fn watched_paths(&self) -> Vec<PathBuf> {
            Vec::new()
        }

        async fn start(&self) -> TaskResult<()> {
            Ok(())
        }

        async fn poll(&self) -> TaskResult<Option<u32>> {
            let seen = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if seen >= self.polls_until_done {
                Ok(Some(7))
            } else {
                Ok(None)
            }
        }

        async fn abort(&self) -> TaskResult<bool> {
            self.aborts.fetch_add(1, Ordering::SeqCst);
            Ok(self.abortable)
        }
    }

    fn counting(polls_until_done: usize, abortable: bool) -> Box<CountingTask> {
        Box::new(CountingTask {
            polls_until_done,
            polls: AtomicUsize::new(0),
            abortable,
            aborts: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn poll_loop_settles_with_the_task_result() -> anyhow::Result<()> {
        let (future, receiver) = TaskFuture::new(counting(3, true), None);
        spawn_poll_loop(future.clone(), Duration::from_millis(5));
        match receiver.await? {
            Outcome::Completed(value) => assert_eq!(value, 7),
            _ => panic!("expected completion"),
        }
        assert!(future.is_done());
        Ok(())
    }

    #[tokio::test]
    async fn cancel_settles_cancelled_when_abort_succeeds() -> anyhow::Result<()> {
        let (future, receiver) = TaskFuture::new(counting(usize::MAX, true), None);
        spawn_poll_loop(future.clone(), Duration::from_secs(60));
        assert!(future.cancel_task().await);
        assert!(matches!(receiver.await?, Outcome::Cancelled));

        // Settled futures refuse further cancellation.
        assert!(!future.cancel_task().await);
        Ok(())
    }

    #[tokio::test]
    async fn cancel_is_refused_when_abort_declines() {
        let (future, _receiver) = TaskFuture::new(counting(usize::MAX, false), None);
        assert!(!future.cancel_task().await);
        assert!(!future.is_done());
    }

    #[tokio::test]
    async fn poll_after_settlement_is_a_no_op() -> anyhow::Result<()> {
        let task = counting(1, true);
        let (future, receiver) = TaskFuture::new(task, None);
        future.poll_task().await;
        assert!(matches!(receiver.await?, Outcome::Completed(7)));
        // Any further poll finds the gate closed.
        future.poll_task().await;
        assert!(future.is_done());
        Ok(())
    }
}
