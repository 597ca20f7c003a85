//! # Design
//!
//! - Structured, constant-message errors for task execution.
//! - Capture the operation and path so failures are reproducible in tests.
//! - Daemon-reported failures keep the daemon's own code and message; the
//!   ledger passes them to the pool manager unchanged.

use std::io;
use std::path::PathBuf;

use tapebridge_protocol::{DaemonFailure, ProtocolError};
use thiserror::Error;

/// Result type for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors produced while driving a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// IO failure while interacting with the exchange directories.
    #[error("task io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The daemon reported a failure through an error file.
    #[error("daemon reported failure")]
    Daemon(DaemonFailure),
    /// The file-based protocol was violated.
    #[error("protocol violation")]
    Protocol(#[from] ProtocolError),
    /// The directory layout was missing or invalid.
    #[error("invalid directory layout")]
    Layout {
        /// Path that failed the layout check.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
    },
}

impl TaskError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
