//! # Design
//!
//! [`NearlineBridge`] is the front door: it validates the exchange directory
//! tree once at construction, purges descriptors left over from a previous
//! run, and then accepts stage, flush, and remove requests. Each request
//! becomes a task wrapped in a settle-once future; completion is routed back
//! through the request's callbacks by the ledger, exactly once.
//!
//! Two scheduling strategies are supported. `poll` drives every future on a
//! fixed timer. `watch` registers each future's files with a filesystem
//! watcher and polls only when one of them changes, falling back to a full
//! re-poll on event overflow.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::future::{TaskFuture, spawn_poll_loop};
use crate::ledger::{RequestLedger, SettledOutcome};
use crate::registry::WatchRegistry;
use crate::spi::{FlushRequest, HookError, NearlineRequest, RemoveRequest, StageRequest};
use crate::watcher::DirectoryWatcher;
use tapebridge_config::{BridgeConfig, SchedulingStrategy};
use tapebridge_tasks::{
    DirectoryLayout, FlushParams, FlushTask, PollingTask, RemoveTask, StageParams, StageTask,
};

enum Scheduling {
    Poll {
        period: Duration,
    },
    Watch {
        registry: WatchRegistry,
        watcher: Mutex<Option<DirectoryWatcher>>,
    },
}

struct Inner {
    layout: DirectoryLayout,
    storage_type: String,
    storage_name: String,
    pid: u32,
    error_grace: Duration,
    ledger: RequestLedger,
    scheduling: Scheduling,
}

/// Asynchronous bridge between a storage pool and a tape-archiving daemon.
///
/// Cheap to clone; all clones share the same ledger and scheduler.
#[derive(Clone)]
pub struct NearlineBridge {
    inner: Arc<Inner>,
}

impl NearlineBridge {
    /// Construct a bridge over the exchange directory tree named by `config`.
    ///
    /// Validates the tree, purges stale request descriptors, and when the
    /// watch strategy is configured starts the filesystem watcher.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory tree is missing or inaccessible,
    /// or when the filesystem watcher cannot be started.
    pub async fn new(config: &BridgeConfig) -> EngineResult<Self> {
        let layout = DirectoryLayout::open(&config.root)?;
        layout.purge_requests().await?;

        let scheduling = match config.strategy {
            SchedulingStrategy::Poll => Scheduling::Poll {
                period: config.poll_period(),
            },
            SchedulingStrategy::Watch => {
                let registry = WatchRegistry::default();
                let watcher = DirectoryWatcher::spawn(&layout, registry.clone())?;
                Scheduling::Watch {
                    registry,
                    watcher: Mutex::new(Some(watcher)),
                }
            }
        };

        info!(
            root = %config.root.display(),
            strategy = ?config.strategy,
            "nearline bridge started"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                layout,
                storage_type: config.storage_type.clone(),
                storage_name: config.storage_name.clone(),
                pid: std::process::id(),
                error_grace: config.error_grace(),
                ledger: RequestLedger::default(),
                scheduling,
            }),
        })
    }

    /// Recall a file from tape into the pool.
    ///
    /// Returns immediately; the outcome arrives through the request's
    /// `completed` or `failed` callback.
    pub fn stage(&self, request: Arc<dyn StageRequest>) {
        let params = StageParams {
            content_id: request.content_id(),
            size: request.size(),
            destination: request.destination(),
            storage_class: request.storage_class(),
        };
        let task = StageTask::new(
            params,
            &self.inner.layout,
            self.inner.pid,
            self.inner.error_grace,
        );
        let hooks = Arc::clone(&request);
        self.dispatch(
            request.id(),
            Box::new(task),
            move |outcome| match outcome {
                SettledOutcome::Completed(checksums) => request.completed(checksums),
                SettledOutcome::Failed { code, message } => request.failed(code, message),
            },
            move |req| async move {
                req.activate().await?;
                req.allocate().await
            },
            hooks,
        );
    }

    /// Archive a pool file to tape, reporting its locator on completion.
    pub fn flush(&self, request: Arc<dyn FlushRequest>) {
        let params = FlushParams {
            content_id: request.content_id(),
            source: request.source(),
            size: request.size(),
            storage_class: request.storage_class(),
            checksum: request.checksum(),
        };
        let task = FlushTask::new(
            params,
            &self.inner.layout,
            self.inner.storage_type.clone(),
            self.inner.storage_name.clone(),
        );
        let hooks = Arc::clone(&request);
        self.dispatch(
            request.id(),
            Box::new(task),
            move |outcome| match outcome {
                SettledOutcome::Completed(locators) => request.completed(locators),
                SettledOutcome::Failed { code, message } => request.failed(code, message),
            },
            move |req| async move { req.activate().await },
            hooks,
        );
    }

    /// Ask the daemon to delete an archived replica.
    pub fn remove(&self, request: Arc<dyn RemoveRequest>) {
        let task = RemoveTask::new(request.uri(), &self.inner.layout);
        let hooks = Arc::clone(&request);
        self.dispatch(
            request.id(),
            Box::new(task),
            move |outcome| match outcome {
                SettledOutcome::Completed(()) => request.completed(),
                SettledOutcome::Failed { code, message } => request.failed(code, message),
            },
            move |_req| async move { Ok::<(), HookError>(()) },
            hooks,
        );
    }

    /// Cancel the request dispatched under `request_id`.
    ///
    /// Returns `true` when the request transitioned to cancelled, `false`
    /// when it is unknown or already settled.
    pub async fn cancel(&self, request_id: Uuid) -> bool {
        self.inner.ledger.cancel(request_id).await
    }

    /// Stop the watcher (when one is running) and cancel every in-flight
    /// request. Requests submitted afterwards are still accepted but the
    /// watch strategy no longer receives events for them.
    pub async fn shutdown(&self) {
        if let Scheduling::Watch { watcher, .. } = &self.inner.scheduling {
            let taken = watcher.lock().await.take();
            if let Some(watcher) = taken {
                watcher.shutdown().await;
            }
        }
        self.inner.ledger.cancel_all().await;
        info!("nearline bridge shut down");
    }

    fn dispatch<T, R, P, Fut>(
        &self,
        request_id: Uuid,
        task: Box<dyn PollingTask<Output = T>>,
        on_settled: impl FnOnce(SettledOutcome<T>) + Send + 'static,
        prologue: P,
        hooks: Arc<R>,
    ) where
        T: Send + 'static,
        R: NearlineRequest + ?Sized,
        P: FnOnce(Arc<R>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), HookError>> + Send + 'static,
    {
        let step = match &self.inner.scheduling {
            Scheduling::Poll { period } => SchedulingStep::Poll { period: *period },
            Scheduling::Watch { registry, .. } => SchedulingStep::Watch {
                registry: registry.clone(),
            },
        };
        let registry = match &step {
            SchedulingStep::Poll { .. } => None,
            SchedulingStep::Watch { registry } => Some(registry.clone()),
        };
        let (future, receiver) = TaskFuture::new(task, registry);
        debug!(%request_id, future_id = %future.id(), "request dispatched");

        self.inner
            .ledger
            .track(request_id, Arc::new(future.clone()), receiver, on_settled);

        tokio::spawn(async move {
            if let Err(source) = prologue(hooks).await {
                future
                    .fail(EngineError::hook("activate request", source))
                    .await;
                return;
            }
            if let Err(err) = future.start_task().await {
                future.fail(err).await;
                return;
            }
            match step {
                SchedulingStep::Poll { period } => {
                    // First look right away so an already-satisfied task does
                    // not wait out a full period.
                    future.poll_task().await;
                    if !future.is_done() {
                        spawn_poll_loop(future, period);
                    }
                }
                SchedulingStep::Watch { registry } => {
                    let paths = future.watched_paths();
                    if let Err(err) = registry.register(Arc::new(future.clone()), &paths) {
                        warn!(future_id = %future.id(), error = %err, "watch registration failed");
                        future.fail(err).await;
                        return;
                    }
                    // The files may have appeared between start and
                    // registration.
                    future.poll_task().await;
                }
            }
        });
    }
}

enum SchedulingStep {
    Poll { period: Duration },
    Watch { registry: WatchRegistry },
}
