//! Deletion of a previously archived copy.

use std::path::PathBuf;

use async_trait::async_trait;
use tapebridge_protocol::bfid_from_uri;
use tokio::fs;
use tracing::debug;

use crate::error::{TaskError, TaskResult};
use crate::layout::DirectoryLayout;
use crate::task::PollingTask;

/// Single-shot task dropping a delete marker into `trash/`.
///
/// The daemon processes markers asynchronously and on its own schedule;
/// there is nothing to poll for, so `start` does all the work and the first
/// `poll` reports completion.
#[derive(Debug)]
pub struct RemoveTask {
    uri: String,
    trash_dir: PathBuf,
}

impl RemoveTask {
    /// Build a remove task for the locator a flush produced earlier.
    #[must_use]
    pub fn new(uri: impl Into<String>, layout: &DirectoryLayout) -> Self {
        Self {
            uri: uri.into(),
            trash_dir: layout.trash_dir().to_path_buf(),
        }
    }
}

#[async_trait]
impl PollingTask for RemoveTask {
    type Output = ();

    fn watched_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    async fn start(&self) -> TaskResult<()> {
        let bfid = bfid_from_uri(&self.uri)?;
        let marker = self.trash_dir.join(&bfid);
        fs::write(&marker, self.uri.as_bytes())
            .await
            .map_err(|source| TaskError::io("remove.write_marker", &marker, source))?;
        debug!(bfid, "delete marker written");
        Ok(())
    }

    async fn poll(&self) -> TaskResult<Option<Self::Output>> {
        Ok(Some(()))
    }

    async fn abort(&self) -> TaskResult<bool> {
        // Once the marker is on disk the daemon owns the deletion.
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapebridge_protocol::ProtocolError;

    fn make_layout() -> anyhow::Result<(tempfile::TempDir, DirectoryLayout)> {
        let dir = tempfile::tempdir()?;
        for name in ["request", "in", "out", "trash"] {
            std::fs::create_dir(dir.path().join(name))?;
        }
        let layout = DirectoryLayout::open(dir.path())?;
        Ok((dir, layout))
    }

    #[tokio::test]
    async fn marker_contains_the_full_locator_text() -> anyhow::Result<()> {
        let (_dir, layout) = make_layout()?;
        let task = RemoveTask::new("osm://tape-main/?bfid=0000ABCD", &layout);
        task.start().await?;
        assert_eq!(task.poll().await?, Some(()));

        let marker = layout.trash_dir().join("0000ABCD");
        assert_eq!(
            std::fs::read_to_string(marker)?,
            "osm://tape-main/?bfid=0000ABCD"
        );
        Ok(())
    }

    #[tokio::test]
    async fn locator_without_bfid_fails_the_operation() -> anyhow::Result<()> {
        let (_dir, layout) = make_layout()?;
        let task = RemoveTask::new("osm://tape-main/?volume=3", &layout);
        let err = task.start().await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::Protocol(ProtocolError::MissingBfid { .. })
        ));
        assert_eq!(std::fs::read_dir(layout.trash_dir())?.count(), 0);
        Ok(())
    }
}
