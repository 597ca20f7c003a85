//! # Design
//!
//! - Per-task failures are confined to the task's future and surface only
//!   through the ledger's completion routing; nothing crosses task
//!   boundaries.
//! - A duplicate watch registration is an invariant breach, not a runtime
//!   condition: the offending future is failed and the conflict kept visible.

use std::error::Error as _;
use std::fmt::Write as _;
use std::path::PathBuf;

use tapebridge_tasks::TaskError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors produced by the completion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A task step failed.
    #[error("task execution failed")]
    Task(#[from] TaskError),
    /// Two tasks claimed the same watched path.
    #[error("duplicate watch registration")]
    DuplicateWatch {
        /// The path claimed twice.
        path: PathBuf,
    },
    /// The directory watcher could not be set up.
    #[error("directory watcher failure")]
    Watcher {
        /// Operation that triggered the watcher failure.
        operation: &'static str,
        /// Underlying notification-facility error.
        source: notify::Error,
    },
    /// A pool-side lifecycle hook rejected the request.
    #[error("request lifecycle hook failed")]
    Hook {
        /// Hook that failed (`activate` or `allocate`).
        operation: &'static str,
        /// Rendered hook error.
        message: String,
    },
}

impl EngineError {
    pub(crate) fn hook(operation: &'static str, source: crate::spi::HookError) -> Self {
        Self::Hook {
            operation,
            message: source.to_string(),
        }
    }

    /// Render the error with its source chain for generic failure reporting.
    #[must_use]
    pub fn render_chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            let _ = write!(message, ": {err}");
            source = err.source();
        }
        message
    }
}
