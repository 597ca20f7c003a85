//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Configuration file was not valid TOML.
    #[error("failed to parse configuration file")]
    Parse {
        /// Source TOML error.
        source: Box<toml::de::Error>,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
