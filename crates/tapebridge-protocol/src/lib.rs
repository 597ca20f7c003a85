#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Wire conventions shared with the tape-archiving daemon.
//!
//! The daemon has no API surface: every exchange happens through files in a
//! shared directory tree. This crate holds the pure, strategy-independent
//! pieces of that contract: the failure-file format (`error_file`), the
//! archive locator syntax (`locator`), the checksum model (`checksum`), and
//! the JSON request descriptors written into `request/` (`descriptor`).

pub mod checksum;
pub mod descriptor;
pub mod error;
pub mod error_file;
pub mod locator;

pub use checksum::{Checksum, ChecksumKind};
pub use descriptor::{DescriptorAction, FlushDescriptor, StageDescriptor};
pub use error::{ProtocolError, ProtocolResult};
pub use error_file::{DEFAULT_ERROR_CODE, DaemonFailure};
pub use locator::{ArchiveLocator, bfid_from_uri};
