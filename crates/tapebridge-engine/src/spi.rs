//! Pool-side request traits.
//!
//! Request objects are externally owned; the engine only reads their
//! attributes and drives their lifecycle hooks. Exactly one of `completed`
//! or `failed` is invoked per request, exactly once, when its future
//! settles.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tapebridge_protocol::{ArchiveLocator, Checksum};
use uuid::Uuid;

/// Error type produced by pool-side lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Behavior shared by every pool-side request.
#[async_trait]
pub trait NearlineRequest: Send + Sync + 'static {
    /// Identifier of the request, unique per operation.
    fn id(&self) -> Uuid;

    /// Signal that the engine has accepted the request and work is underway.
    async fn activate(&self) -> Result<(), HookError>;

    /// Report terminal failure with the daemon's code and message, or a
    /// generic engine code for everything else.
    fn failed(&self, code: i32, message: String);
}

/// A request to recall a file from tape.
#[async_trait]
pub trait StageRequest: NearlineRequest {
    /// Content identifier naming the exchange files.
    fn content_id(&self) -> String;

    /// Final destination path of the recalled file.
    fn destination(&self) -> PathBuf;

    /// Expected byte size of the recalled file.
    fn size(&self) -> u64;

    /// Storage class recorded in the request descriptor.
    fn storage_class(&self) -> String;

    /// Reserve pool space for the incoming payload.
    async fn allocate(&self) -> Result<(), HookError>;

    /// Report successful recall; the daemon supplies no checksums.
    fn completed(&self, checksums: HashSet<Checksum>);
}

/// A request to migrate a file to tape.
#[async_trait]
pub trait FlushRequest: NearlineRequest {
    /// Content identifier; becomes the locator's `bfid`.
    fn content_id(&self) -> String;

    /// Pool-side path of the file to archive.
    fn source(&self) -> PathBuf;

    /// Byte size of the file.
    fn size(&self) -> u64;

    /// Storage class recorded in the request descriptor.
    fn storage_class(&self) -> String;

    /// Checksum of the file, when the pool has one.
    fn checksum(&self) -> Option<Checksum>;

    /// Report successful migration with the locators of the archived copy.
    fn completed(&self, locators: Vec<ArchiveLocator>);
}

/// A request to delete a previously archived copy.
#[async_trait]
pub trait RemoveRequest: NearlineRequest {
    /// Locator text produced by an earlier flush.
    fn uri(&self) -> String;

    /// Report that the delete marker has been handed to the daemon.
    fn completed(&self);
}
