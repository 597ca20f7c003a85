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

//! Task state machines for the three daemon operations.
//!
//! Each task operates on the fixed directory layout (`layout.rs`) through
//! atomic filesystem primitives only: exclusive-ish descriptor writes, hard
//! links, atomic renames, and deletes. The [`PollingTask`] trait (`task.rs`)
//! is the seam the scheduling strategies drive; `stage.rs`, `flush.rs`, and
//! `remove.rs` implement it for recall, migration, and deletion.

pub mod error;
pub mod flush;
pub mod layout;
pub mod remove;
pub mod stage;
pub mod task;

pub use error::{TaskError, TaskResult};
pub use flush::{FlushParams, FlushTask};
pub use layout::DirectoryLayout;
pub use remove::RemoveTask;
pub use stage::{StageParams, StageTask};
pub use task::PollingTask;
