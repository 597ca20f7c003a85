//! JSON request descriptors written into `request/`.
//!
//! Deployed daemons historically accepted either a bare `<pid> <unix-secs>`
//! line or a structured JSON record. This implementation commits to the JSON
//! schema for both operations; the minimal line format is not emitted.

use std::path::Path;

use serde::Serialize;

use crate::checksum::Checksum;
use crate::error::ProtocolResult;

/// Operation requested from the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorAction {
    /// Recall a file from tape into `in/`.
    Recall,
    /// Migrate a file from `out/` to tape.
    Migrate,
}

/// Descriptor announcing a recall to the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct StageDescriptor {
    /// Always [`DescriptorAction::Recall`].
    pub action: DescriptorAction,
    /// Expected byte size of the recalled file.
    pub file_size: u64,
    /// Process id of the engine, captured once at startup.
    pub parent_pid: u32,
    /// Request time as unix seconds.
    pub time: i64,
    /// Storage class of the content.
    pub storage_class: String,
    /// Final destination path of the recalled file.
    pub path: String,
}

impl StageDescriptor {
    /// Build a recall descriptor for the given content.
    #[must_use]
    pub fn new(file_size: u64, parent_pid: u32, storage_class: String, path: &Path) -> Self {
        Self {
            action: DescriptorAction::Recall,
            file_size,
            parent_pid,
            time: chrono::Utc::now().timestamp(),
            storage_class,
            path: path.display().to_string(),
        }
    }

    /// Render the descriptor as the JSON record the daemon expects.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ProtocolError::Descriptor`] if serialization fails.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Descriptor announcing a migration to the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct FlushDescriptor {
    /// Always [`DescriptorAction::Migrate`].
    pub action: DescriptorAction,
    /// Byte size of the file to archive.
    pub file_size: u64,
    /// Request time as unix seconds.
    pub time: i64,
    /// Storage class of the content.
    pub storage_class: String,
    /// Pool-side path of the file being archived.
    pub path: String,
    /// Checksum algorithm, when the pool supplied one.
    #[serde(rename = "checksumType", skip_serializing_if = "Option::is_none")]
    pub checksum_type: Option<String>,
    /// Hex checksum value, when the pool supplied one.
    #[serde(rename = "checksumValue", skip_serializing_if = "Option::is_none")]
    pub checksum_value: Option<String>,
}

impl FlushDescriptor {
    /// Build a migrate descriptor for the given content.
    #[must_use]
    pub fn new(
        file_size: u64,
        storage_class: String,
        path: &Path,
        checksum: Option<&Checksum>,
    ) -> Self {
        Self {
            action: DescriptorAction::Migrate,
            file_size,
            time: chrono::Utc::now().timestamp(),
            storage_class,
            path: path.display().to_string(),
            checksum_type: checksum.map(|c| c.kind.as_str().to_string()),
            checksum_value: checksum.map(|c| c.value.clone()),
        }
    }

    /// Render the descriptor as the JSON record the daemon expects.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ProtocolError::Descriptor`] if serialization fails.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumKind;

    #[test]
    fn stage_descriptor_carries_recall_action() -> anyhow::Result<()> {
        let descriptor =
            StageDescriptor::new(4096, 1234, "tape:default".into(), Path::new("/pool/data/f"));
        let value: serde_json::Value = serde_json::from_str(&descriptor.to_json()?)?;
        assert_eq!(value["action"], "recall");
        assert_eq!(value["file_size"], 4096);
        assert_eq!(value["parent_pid"], 1234);
        assert_eq!(value["path"], "/pool/data/f");
        Ok(())
    }

    #[test]
    fn flush_descriptor_uses_camel_case_checksum_fields() -> anyhow::Result<()> {
        let checksum = Checksum::new(ChecksumKind::Adler32, "00c0ffee");
        let descriptor = FlushDescriptor::new(
            8192,
            "tape:default".into(),
            Path::new("/pool/data/f"),
            Some(&checksum),
        );
        let value: serde_json::Value = serde_json::from_str(&descriptor.to_json()?)?;
        assert_eq!(value["action"], "migrate");
        assert_eq!(value["checksumType"], "ADLER32");
        assert_eq!(value["checksumValue"], "00c0ffee");
        Ok(())
    }

    #[test]
    fn flush_descriptor_omits_absent_checksum() -> anyhow::Result<()> {
        let descriptor = FlushDescriptor::new(8192, "tape:default".into(), Path::new("/f"), None);
        let value: serde_json::Value = serde_json::from_str(&descriptor.to_json()?)?;
        assert!(value.get("checksumType").is_none());
        Ok(())
    }
}
