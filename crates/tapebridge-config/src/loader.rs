//! Loading and parsing of bridge configuration files.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::BridgeConfig;
use crate::validate;

/// Load, parse, and validate a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Parse`] when it is not valid TOML, and
/// [`ConfigError::InvalidField`] when a value fails validation.
pub fn load_config(path: &Path) -> ConfigResult<BridgeConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw)
}

/// Parse and validate configuration from a TOML string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::InvalidField`] when a value fails validation.
pub fn parse_config(raw: &str) -> ConfigResult<BridgeConfig> {
    let config: BridgeConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        source: Box::new(source),
    })?;
    validate::validate(&config)?;
    Ok(config)
}
