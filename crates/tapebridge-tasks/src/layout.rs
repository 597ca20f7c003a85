//! The four-directory exchange tree shared with the daemon.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{TaskError, TaskResult};

/// Validated handle on the exchange directories under a configured root.
///
/// `request/` holds pending-operation descriptors and daemon error files,
/// `in/` receives recalled payloads, `out/` holds hard links awaiting
/// archival, and `trash/` receives delete markers.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    request_dir: PathBuf,
    in_dir: PathBuf,
    out_dir: PathBuf,
    trash_dir: PathBuf,
}

impl DirectoryLayout {
    /// Open the layout under `root`, requiring all four directories to exist.
    ///
    /// The root is canonicalized so that paths derived here compare equal to
    /// the paths reported by filesystem-change notifications.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Layout`] naming the first missing directory.
    pub fn open(root: &Path) -> TaskResult<Self> {
        let root = root.canonicalize().map_err(|_| TaskError::Layout {
            path: root.to_path_buf(),
            reason: "not accessible",
        })?;
        let layout = Self {
            request_dir: root.join("request"),
            in_dir: root.join("in"),
            out_dir: root.join("out"),
            trash_dir: root.join("trash"),
        };
        for dir in [
            &layout.request_dir,
            &layout.in_dir,
            &layout.out_dir,
            &layout.trash_dir,
        ] {
            if !dir.is_dir() {
                return Err(TaskError::Layout {
                    path: dir.clone(),
                    reason: "not a directory",
                });
            }
        }
        Ok(layout)
    }

    /// Delete every regular file left in `request/`.
    ///
    /// Called on (re)configuration: descriptors surviving an engine restart
    /// belong to requests nobody is waiting on any more.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Io`] when the directory cannot be listed;
    /// individual deletion failures are logged and skipped.
    pub async fn purge_requests(&self) -> TaskResult<()> {
        let mut entries = tokio::fs::read_dir(&self.request_dir)
            .await
            .map_err(|source| TaskError::io("purge.read_dir", &self.request_dir, source))?;
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| TaskError::io("purge.next_entry", &self.request_dir, source))?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "purged stale request file"),
                Err(err) => warn!(
                    error = %err,
                    path = %path.display(),
                    "failed to purge stale request file"
                ),
            }
        }
        Ok(())
    }

    /// Directory holding request descriptors and error files.
    #[must_use]
    pub fn request_dir(&self) -> &Path {
        &self.request_dir
    }

    /// Directory where the daemon delivers recalled payloads.
    #[must_use]
    pub fn in_dir(&self) -> &Path {
        &self.in_dir
    }

    /// Directory holding hard links awaiting archival.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Directory receiving delete markers.
    #[must_use]
    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tree() -> anyhow::Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        for name in ["request", "in", "out", "trash"] {
            std::fs::create_dir(dir.path().join(name))?;
        }
        Ok(dir)
    }

    #[test]
    fn open_requires_all_four_directories() -> anyhow::Result<()> {
        let dir = make_tree()?;
        assert!(DirectoryLayout::open(dir.path()).is_ok());

        std::fs::remove_dir(dir.path().join("trash"))?;
        let err = DirectoryLayout::open(dir.path()).unwrap_err();
        assert!(matches!(err, TaskError::Layout { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn purge_removes_stale_request_files() -> anyhow::Result<()> {
        let dir = make_tree()?;
        let layout = DirectoryLayout::open(dir.path())?;
        std::fs::write(layout.request_dir().join("stale-1"), b"x")?;
        std::fs::write(layout.request_dir().join("stale-2.err"), b"y")?;

        layout.purge_requests().await?;

        assert_eq!(std::fs::read_dir(layout.request_dir())?.count(), 0);
        Ok(())
    }
}
