//! Filesystem event bridge for the watch strategy.
//!
//! A platform watcher observes the exchange directories and forwards events
//! over a channel into a tokio task, which routes each touched path to the
//! future registered for it. Overflow and watcher errors degrade to a full
//! re-poll of every registered future rather than dropping work.

use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::registry::WatchRegistry;
use tapebridge_tasks::DirectoryLayout;

/// Background task dispatching filesystem events to registered futures.
pub(crate) struct DirectoryWatcher {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl DirectoryWatcher {
    /// Start watching the exchange directories and spawn the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Watcher`] when the platform watcher cannot be
    /// created or a directory cannot be added to it.
    pub(crate) fn spawn(layout: &DirectoryLayout, registry: WatchRegistry) -> EngineResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |event: Result<notify::Event, notify::Error>| {
                // Dispatch runs on the tokio side; a closed channel just means
                // the loop already shut down.
                let _ = tx.send(event);
            })
            .map_err(|source| EngineError::Watcher {
                operation: "create watcher",
                source,
            })?;

        for dir in [layout.request_dir(), layout.in_dir(), layout.out_dir()] {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| EngineError::Watcher {
                    operation: "watch directory",
                    source,
                })?;
        }

        let shutdown = Arc::new(Notify::new());
        let join = tokio::spawn(run(watcher, rx, registry, Arc::clone(&shutdown)));
        Ok(Self { shutdown, join })
    }

    /// Stop the dispatch loop and cancel every future still registered.
    pub(crate) async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(err) = self.join.await {
            warn!(error = %err, "watcher task did not shut down cleanly");
        }
    }
}

async fn run(
    watcher: RecommendedWatcher,
    mut rx: mpsc::UnboundedReceiver<Result<notify::Event, notify::Error>>,
    registry: WatchRegistry,
    shutdown: Arc<Notify>,
) {
    // Futures registered before the watcher came up may already have their
    // files on disk; give every outstanding future one initial look.
    registry.poll_all().await;

    loop {
        let event = tokio::select! {
            () = shutdown.notified() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            Ok(event) if event.need_rescan() => {
                debug!("event queue overflowed, re-polling all registered futures");
                registry.poll_all().await;
            }
            Ok(event) => {
                for path in &event.paths {
                    registry.poll_path(path).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "filesystem watcher reported an error, re-polling");
                registry.poll_all().await;
            }
        }
    }

    // Stop receiving events before cancelling so no poll races a cancel.
    drop(watcher);
    registry.cancel_all().await;
}
