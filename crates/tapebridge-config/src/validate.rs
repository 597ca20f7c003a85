//! Validation pass over a parsed configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::model::BridgeConfig;

/// Validate field values of a parsed configuration.
///
/// Directory existence is deliberately not checked here; the engine checks
/// the layout when it opens it, so that validation and use cannot race a
/// daemon restart.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate(config: &BridgeConfig) -> ConfigResult<()> {
    if config.root.as_os_str().is_empty() {
        return Err(invalid("root", "empty", None));
    }
    if config.storage_type.trim().is_empty() {
        return Err(invalid("storage_type", "empty", None));
    }
    if config.storage_type.contains([':', '/']) {
        return Err(invalid(
            "storage_type",
            "contains locator delimiter",
            Some(config.storage_type.clone()),
        ));
    }
    if config.storage_name.trim().is_empty() {
        return Err(invalid("storage_name", "empty", None));
    }
    if config.storage_name.contains(['/', '?']) {
        return Err(invalid(
            "storage_name",
            "contains locator delimiter",
            Some(config.storage_name.clone()),
        ));
    }
    if config.poll_period_ms == 0 {
        return Err(invalid("poll_period_ms", "must be positive", Some("0".into())));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &'static str, value: Option<String>) -> ConfigError {
    ConfigError::InvalidField {
        field,
        reason,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_config;

    fn base() -> BridgeConfig {
        parse_config(
            r#"
root = "/var/spool/tapebridge"
storage_type = "osm"
storage_name = "tape-main"
"#,
        )
        .expect("base config parses")
    }

    #[test]
    fn base_config_is_valid() {
        assert!(validate(&base()).is_ok());
    }

    #[test]
    fn empty_storage_type_is_rejected() {
        let mut config = base();
        config.storage_type = "  ".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidField {
                field: "storage_type",
                ..
            })
        ));
    }

    #[test]
    fn storage_name_with_slash_is_rejected() {
        let mut config = base();
        config.storage_name = "a/b".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_poll_period_is_rejected() {
        let mut config = base();
        config.poll_period_ms = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidField {
                field: "poll_period_ms",
                ..
            })
        ));
    }
}
