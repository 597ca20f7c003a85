//! Path-to-future fan-out for the watch strategy.
//!
//! At most one future may hold a given path at a time. A second claim is an
//! invariant breach: the offending future's partial registration is rolled
//! back and the future is failed, leaving the first registrant untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::future::TaskHandle;

/// Concurrent map from watched path to the single future awaiting it.
#[derive(Clone, Default)]
pub(crate) struct WatchRegistry {
    map: Arc<DashMap<PathBuf, Arc<dyn TaskHandle>>>,
}

impl WatchRegistry {
    /// Register a future under every path its task watches.
    ///
    /// On a duplicate claim the paths already inserted for this future are
    /// removed again before the error is returned.
    pub(crate) fn register(
        &self,
        handle: Arc<dyn TaskHandle>,
        paths: &[PathBuf],
    ) -> EngineResult<()> {
        for (index, path) in paths.iter().enumerate() {
            match self.map.entry(path.clone()) {
                Entry::Occupied(_) => {
                    self.unregister(handle.future_id(), &paths[..index]);
                    return Err(EngineError::DuplicateWatch { path: path.clone() });
                }
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&handle));
                }
            }
        }
        debug!(future_id = %handle.future_id(), paths = paths.len(), "watch paths registered");
        Ok(())
    }

    /// Remove the given future's claim on each path, leaving entries owned
    /// by other futures in place.
    pub(crate) fn unregister(&self, future_id: Uuid, paths: &[PathBuf]) {
        for path in paths {
            self.map
                .remove_if(path, |_, handle| handle.future_id() == future_id);
        }
    }

    /// Poll the future registered under `path`, if any.
    pub(crate) async fn poll_path(&self, path: &Path) {
        // Clone out of the map so no shard lock is held across the poll.
        let handle = self.map.get(path).map(|entry| Arc::clone(entry.value()));
        if let Some(handle) = handle {
            handle.poll_now().await;
        }
    }

    /// Poll every outstanding future once (startup and overflow resync).
    pub(crate) async fn poll_all(&self) {
        for handle in self.distinct_handles() {
            handle.poll_now().await;
        }
    }

    /// Cancel every outstanding future (watcher termination).
    pub(crate) async fn cancel_all(&self) {
        for handle in self.distinct_handles() {
            handle.cancel().await;
        }
    }

    fn distinct_handles(&self) -> Vec<Arc<dyn TaskHandle>> {
        let mut seen = std::collections::HashSet::new();
        self.map
            .iter()
            .filter(|entry| seen.insert(entry.value().future_id()))
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.map.len()
    }
}
