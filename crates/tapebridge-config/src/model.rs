//! Typed configuration model for the bridge.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default interval between polls in the timer strategy.
pub(crate) const DEFAULT_POLL_PERIOD_MS: u64 = 5_000;

/// Default grace period before reading a freshly appeared error file.
pub(crate) const DEFAULT_ERROR_GRACE_MS: u64 = 1_000;

/// How task completion is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStrategy {
    /// Fixed-interval polling of every in-flight task.
    #[default]
    Poll,
    /// Filesystem-event driven polling of affected tasks only.
    Watch,
}

/// Configuration of a bridge instance.
///
/// The `root` directory must contain the four exchange directories
/// (`request/`, `in/`, `out/`, `trash/`); their existence is checked when the
/// engine opens the layout, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Root of the shared directory tree.
    pub root: PathBuf,
    /// Storage type, used as the locator scheme.
    pub storage_type: String,
    /// Storage instance name, used as the locator authority.
    pub storage_name: String,
    /// Completion-detection strategy.
    #[serde(default)]
    pub strategy: SchedulingStrategy,
    /// Poll interval in milliseconds (timer strategy only).
    #[serde(default = "default_poll_period_ms")]
    pub poll_period_ms: u64,
    /// Grace period in milliseconds before reading an error file.
    #[serde(default = "default_error_grace_ms")]
    pub error_grace_ms: u64,
}

impl BridgeConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    /// Error-file grace period as a [`Duration`].
    #[must_use]
    pub const fn error_grace(&self) -> Duration {
        Duration::from_millis(self.error_grace_ms)
    }
}

const fn default_poll_period_ms() -> u64 {
    DEFAULT_POLL_PERIOD_MS
}

const fn default_error_grace_ms() -> u64 {
    DEFAULT_ERROR_GRACE_MS
}
