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

//! Asynchronous task-completion engine bridging a pool manager to the
//! tape-archiving daemon.
//!
//! The daemon signals progress only through the appearance, disappearance,
//! or content of files in the shared directory tree. This crate turns those
//! signals into cancellable futures: each dispatched operation becomes a
//! task future registered in the request ledger (and, under the watch
//! strategy, in the watch registry), driven forward either by a fixed-period
//! timer loop or by directory-change notifications, and settled exactly once
//! back onto the originating request.
//!
//! Layout: `spi.rs` (pool-side request traits), `future.rs` (the cancellable
//! task future and timer loop), `registry.rs` (path-to-future fan-out),
//! `watcher.rs` (directory-notification source), `ledger.rs` (request
//! routing), `engine.rs` (the [`NearlineBridge`] facade).

pub mod engine;
pub mod error;
mod future;
mod ledger;
mod registry;
pub mod spi;
mod watcher;

pub use engine::NearlineBridge;
pub use error::{EngineError, EngineResult};
pub use spi::{FlushRequest, HookError, NearlineRequest, RemoveRequest, StageRequest};
