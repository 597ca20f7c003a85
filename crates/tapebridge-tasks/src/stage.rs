//! Recall of a tape-resident file back to disk.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tapebridge_protocol::{Checksum, DaemonFailure, StageDescriptor};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{TaskError, TaskResult};
use crate::layout::DirectoryLayout;
use crate::task::PollingTask;

/// Inputs for a stage task, read off the pool-side request at dispatch.
#[derive(Debug, Clone)]
pub struct StageParams {
    /// Content identifier; names the descriptor, error, and in files.
    pub content_id: String,
    /// Expected byte size of the recalled payload.
    pub size: u64,
    /// Final destination path on the pool.
    pub destination: PathBuf,
    /// Storage class recorded in the descriptor.
    pub storage_class: String,
}

/// State machine recalling one file from tape.
///
/// The daemon is asked to act by a descriptor in `request/`; it answers
/// either with the payload in `in/` or an error file next to the descriptor.
#[derive(Debug)]
pub struct StageTask {
    destination: PathBuf,
    in_file: PathBuf,
    error_file: PathBuf,
    request_file: PathBuf,
    size: u64,
    storage_class: String,
    pid: u32,
    error_grace: Duration,
}

impl StageTask {
    /// Derive the task's file paths from the request and layout.
    #[must_use]
    pub fn new(params: StageParams, layout: &DirectoryLayout, pid: u32, error_grace: Duration) -> Self {
        let id = &params.content_id;
        Self {
            destination: params.destination,
            in_file: layout.in_dir().join(id),
            error_file: layout.request_dir().join(format!("{id}.err")),
            request_file: layout.request_dir().join(id),
            size: params.size,
            storage_class: params.storage_class,
            pid,
            error_grace,
        }
    }

    /// Best-effort removal of the in-file / error-file / descriptor triad.
    ///
    /// Every deletion is attempted regardless of the others; failures are
    /// logged and suppressed so the daemon-reported error stays the one the
    /// caller sees.
    async fn remove_triad(&self) {
        for path in [&self.in_file, &self.error_file, &self.request_file] {
            if let Err(err) = fs::remove_file(path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        error = %err,
                        path = %path.display(),
                        "failed to clean up after stage failure"
                    );
                }
            }
        }
    }

    async fn handle_error_file(&self) -> TaskError {
        // Grace period: the daemon may still be writing the error file. This
        // narrows the read/write race, it does not close it.
        tokio::time::sleep(self.error_grace).await;
        let outcome = match fs::read_to_string(&self.error_file).await {
            Ok(content) => TaskError::Daemon(DaemonFailure::parse(&content)),
            Err(source) => TaskError::io("stage.read_error_file", &self.error_file, source),
        };
        self.remove_triad().await;
        outcome
    }
}

#[async_trait]
impl PollingTask for StageTask {
    type Output = HashSet<Checksum>;

    fn watched_paths(&self) -> Vec<PathBuf> {
        vec![self.error_file.clone(), self.in_file.clone()]
    }

    async fn start(&self) -> TaskResult<()> {
        let descriptor = StageDescriptor::new(
            self.size,
            self.pid,
            self.storage_class.clone(),
            &self.destination,
        );
        fs::write(&self.request_file, descriptor.to_json()?)
            .await
            .map_err(|source| TaskError::io("stage.write_descriptor", &self.request_file, source))?;
        debug!(path = %self.request_file.display(), "stage descriptor written");
        Ok(())
    }

    async fn poll(&self) -> TaskResult<Option<Self::Output>> {
        if fs::try_exists(&self.error_file).await.unwrap_or(false) {
            return Err(self.handle_error_file().await);
        }

        let Ok(metadata) = fs::metadata(&self.in_file).await else {
            return Ok(None);
        };
        if !metadata.is_file() || metadata.len() != self.size {
            return Ok(None);
        }

        fs::rename(&self.in_file, &self.destination)
            .await
            .map_err(|source| TaskError::io("stage.move_payload", &self.in_file, source))?;
        if let Err(err) = fs::remove_file(&self.request_file).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    error = %err,
                    path = %self.request_file.display(),
                    "failed to remove stage descriptor after completion"
                );
            }
        }
        // The daemon supplies no checksums on recall.
        Ok(Some(HashSet::new()))
    }

    async fn abort(&self) -> TaskResult<bool> {
        match fs::remove_file(&self.request_file).await {
            Ok(()) => {
                // We owned the request; the daemon may have partially
                // delivered, so clear its outputs as well.
                for path in [&self.error_file, &self.in_file] {
                    if let Err(err) = fs::remove_file(path).await {
                        if err.kind() != std::io::ErrorKind::NotFound {
                            warn!(
                                error = %err,
                                path = %path.display(),
                                "failed to clean up while aborting stage"
                            );
                        }
                    }
                }
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(TaskError::io(
                "stage.abort_descriptor",
                &self.request_file,
                source,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_millis(10);

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: DirectoryLayout,
        destination: PathBuf,
    }

    fn fixture() -> anyhow::Result<Fixture> {
        let dir = tempfile::tempdir()?;
        for name in ["request", "in", "out", "trash"] {
            std::fs::create_dir(dir.path().join(name))?;
        }
        let destination = dir.path().join("restored");
        let layout = DirectoryLayout::open(dir.path())?;
        Ok(Fixture {
            _dir: dir,
            layout,
            destination,
        })
    }

    fn task(fixture: &Fixture, size: u64) -> StageTask {
        StageTask::new(
            StageParams {
                content_id: "0000ABCD".into(),
                size,
                destination: fixture.destination.clone(),
                storage_class: "tape:default".into(),
            },
            &fixture.layout,
            4242,
            GRACE,
        )
    }

    #[tokio::test]
    async fn start_writes_recall_descriptor() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture, 3);
        task.start().await?;

        let raw = std::fs::read_to_string(fixture.layout.request_dir().join("0000ABCD"))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value["action"], "recall");
        assert_eq!(value["file_size"], 3);
        assert_eq!(value["parent_pid"], 4242);
        Ok(())
    }

    #[tokio::test]
    async fn poll_is_pending_until_payload_has_expected_size() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture, 4);
        task.start().await?;

        assert!(task.poll().await?.is_none());

        std::fs::write(fixture.layout.in_dir().join("0000ABCD"), b"ab")?;
        assert!(task.poll().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn poll_moves_completed_payload_and_cleans_up() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture, 4);
        task.start().await?;
        std::fs::write(fixture.layout.in_dir().join("0000ABCD"), b"data")?;

        let checksums = task.poll().await?.expect("task resolves");
        assert!(checksums.is_empty());
        assert_eq!(std::fs::read(&fixture.destination)?, b"data");
        assert!(!fixture.layout.in_dir().join("0000ABCD").exists());
        assert!(!fixture.layout.request_dir().join("0000ABCD").exists());
        Ok(())
    }

    #[tokio::test]
    async fn error_file_fails_task_and_removes_triad() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture, 4);
        task.start().await?;
        std::fs::write(fixture.layout.in_dir().join("0000ABCD"), b"partial")?;
        std::fs::write(
            fixture.layout.request_dir().join("0000ABCD.err"),
            "42\nreason text",
        )?;

        let err = task.poll().await.unwrap_err();
        match err {
            TaskError::Daemon(failure) => {
                assert_eq!(failure.code, 42);
                assert_eq!(failure.message, "reason text");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!fixture.layout.in_dir().join("0000ABCD").exists());
        assert!(!fixture.layout.request_dir().join("0000ABCD.err").exists());
        assert!(!fixture.layout.request_dir().join("0000ABCD").exists());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_error_file_defaults_code_and_keeps_content() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture, 4);
        task.start().await?;
        std::fs::write(
            fixture.layout.request_dir().join("0000ABCD.err"),
            "drive offline\ncall operations",
        )?;

        let err = task.poll().await.unwrap_err();
        match err {
            TaskError::Daemon(failure) => {
                assert_eq!(failure.code, tapebridge_protocol::DEFAULT_ERROR_CODE);
                assert_eq!(failure.message, "drive offline\ncall operations");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn abort_removes_descriptor_and_daemon_outputs() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture, 4);
        task.start().await?;
        std::fs::write(fixture.layout.in_dir().join("0000ABCD"), b"pa")?;

        assert!(task.abort().await?);
        assert!(!fixture.layout.request_dir().join("0000ABCD").exists());
        assert!(!fixture.layout.in_dir().join("0000ABCD").exists());

        // Second abort finds nothing to do.
        assert!(!task.abort().await?);
        Ok(())
    }
}
