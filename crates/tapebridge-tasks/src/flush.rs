//! Migration of a disk-resident file to tape.

use std::path::PathBuf;

use async_trait::async_trait;
use tapebridge_protocol::{ArchiveLocator, Checksum, FlushDescriptor};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{TaskError, TaskResult};
use crate::layout::DirectoryLayout;
use crate::task::PollingTask;

/// Inputs for a flush task, read off the pool-side request at dispatch.
#[derive(Debug, Clone)]
pub struct FlushParams {
    /// Content identifier; becomes the locator's `bfid`.
    pub content_id: String,
    /// Pool-side path of the file to archive.
    pub source: PathBuf,
    /// Byte size of the file.
    pub size: u64,
    /// Storage class recorded in the descriptor.
    pub storage_class: String,
    /// Checksum supplied by the pool, when available.
    pub checksum: Option<Checksum>,
}

/// State machine migrating one file to tape.
///
/// The file is exposed to the daemon as a hard link in `out/`; the daemon
/// deletes the link once the copy is safely on tape, which is the completion
/// signal.
#[derive(Debug)]
pub struct FlushTask {
    source: PathBuf,
    out_file: PathBuf,
    request_file: PathBuf,
    content_id: String,
    size: u64,
    storage_class: String,
    checksum: Option<Checksum>,
    storage_type: String,
    storage_name: String,
}

impl FlushTask {
    /// Derive the task's file paths from the request and layout.
    ///
    /// The out-file is named after the source file's final path component;
    /// a source path without one (e.g. `/`) falls back to the content id,
    /// which is unique per request.
    #[must_use]
    pub fn new(
        params: FlushParams,
        layout: &DirectoryLayout,
        storage_type: impl Into<String>,
        storage_name: impl Into<String>,
    ) -> Self {
        let basename = params
            .source
            .file_name()
            .map_or_else(|| params.content_id.clone().into(), PathBuf::from);
        Self {
            out_file: layout.out_dir().join(basename),
            request_file: layout.request_dir().join(&params.content_id),
            source: params.source,
            content_id: params.content_id,
            size: params.size,
            storage_class: params.storage_class,
            checksum: params.checksum,
            storage_type: storage_type.into(),
            storage_name: storage_name.into(),
        }
    }
}

#[async_trait]
impl PollingTask for FlushTask {
    type Output = Vec<ArchiveLocator>;

    fn watched_paths(&self) -> Vec<PathBuf> {
        vec![self.out_file.clone()]
    }

    async fn start(&self) -> TaskResult<()> {
        match fs::hard_link(&self.source, &self.out_file).await {
            Ok(()) => {}
            // A link surviving a previous engine run is the same request.
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(TaskError::io("flush.link_out", &self.out_file, source));
            }
        }
        let descriptor = FlushDescriptor::new(
            self.size,
            self.storage_class.clone(),
            &self.source,
            self.checksum.as_ref(),
        );
        fs::write(&self.request_file, descriptor.to_json()?)
            .await
            .map_err(|source| TaskError::io("flush.write_descriptor", &self.request_file, source))?;
        debug!(path = %self.out_file.display(), "flush link exposed to daemon");
        Ok(())
    }

    async fn poll(&self) -> TaskResult<Option<Self::Output>> {
        if fs::try_exists(&self.out_file).await.unwrap_or(true) {
            return Ok(None);
        }
        if let Err(err) = fs::remove_file(&self.request_file).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    error = %err,
                    path = %self.request_file.display(),
                    "failed to remove flush descriptor after completion"
                );
            }
        }
        let locator = ArchiveLocator::new(
            self.storage_type.clone(),
            self.storage_name.clone(),
            self.content_id.clone(),
        );
        Ok(Some(vec![locator]))
    }

    async fn abort(&self) -> TaskResult<bool> {
        let mut removed = false;
        for (operation, path) in [
            ("flush.abort_out", &self.out_file),
            ("flush.abort_descriptor", &self.request_file),
        ] {
            match fs::remove_file(path).await {
                Ok(()) => removed = true,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(TaskError::io(operation, path, source)),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapebridge_protocol::ChecksumKind;

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: DirectoryLayout,
        source: PathBuf,
    }

    fn fixture() -> anyhow::Result<Fixture> {
        let dir = tempfile::tempdir()?;
        for name in ["request", "in", "out", "trash"] {
            std::fs::create_dir(dir.path().join(name))?;
        }
        let source = dir.path().join("payload.dat");
        std::fs::write(&source, b"payload!")?;
        let layout = DirectoryLayout::open(dir.path())?;
        Ok(Fixture {
            _dir: dir,
            layout,
            source,
        })
    }

    fn task(fixture: &Fixture) -> FlushTask {
        FlushTask::new(
            FlushParams {
                content_id: "0000ABCD".into(),
                source: fixture.source.clone(),
                size: 8,
                storage_class: "tape:default".into(),
                checksum: Some(Checksum::new(ChecksumKind::Adler32, "00c0ffee")),
            },
            &fixture.layout,
            "osm",
            "tape-main",
        )
    }

    #[tokio::test]
    async fn start_links_payload_and_writes_descriptor() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture);
        task.start().await?;

        let out_file = fixture.layout.out_dir().join("payload.dat");
        assert_eq!(std::fs::read(&out_file)?, b"payload!");

        let raw = std::fs::read_to_string(fixture.layout.request_dir().join("0000ABCD"))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value["action"], "migrate");
        assert_eq!(value["checksumType"], "ADLER32");

        // Restart tolerance: a second start finds the link already present.
        task.start().await?;
        Ok(())
    }

    #[tokio::test]
    async fn poll_resolves_once_daemon_deletes_the_link() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture);
        task.start().await?;

        assert!(task.poll().await?.is_none());

        std::fs::remove_file(fixture.layout.out_dir().join("payload.dat"))?;
        let locators = task.poll().await?.expect("task resolves");
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].to_string(), "osm://tape-main/?bfid=0000ABCD");
        assert!(!fixture.layout.request_dir().join("0000ABCD").exists());
        Ok(())
    }

    #[tokio::test]
    async fn abort_reports_whether_anything_was_removed() -> anyhow::Result<()> {
        let fixture = fixture()?;
        let task = task(&fixture);
        task.start().await?;

        assert!(task.abort().await?);
        assert!(!fixture.layout.out_dir().join("payload.dat").exists());
        assert!(!fixture.layout.request_dir().join("0000ABCD").exists());

        // Nothing left to remove.
        assert!(!task.abort().await?);
        Ok(())
    }
}
