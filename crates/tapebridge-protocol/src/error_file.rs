//! Parsing of daemon-written failure files.
//!
//! When a recall fails, the daemon drops `request/<id>.err` next to the
//! request descriptor. The first line is a decimal error code, everything
//! after it is the human-readable reason. Parsing is total: malformed input
//! degrades to [`DEFAULT_ERROR_CODE`] rather than failing the failure path.

use std::fmt;

/// Error code reported when the daemon provides none, or a malformed one.
pub const DEFAULT_ERROR_CODE: i32 = 1;

const NO_REASON: &str = "tape daemon reported a stage failure without providing a reason";

/// A structured failure reported by the daemon through an error file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonFailure {
    /// Daemon-assigned error code, passed through to the pool manager.
    pub code: i32,
    /// Reason text; joined with newlines when the file spans several lines.
    pub message: String,
}

impl DaemonFailure {
    /// Parse the content of an error file.
    ///
    /// An empty file yields the default code and a generic message. A
    /// non-numeric first line yields the default code and the entire file
    /// content as message, so the daemon's text is never lost.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines();
        let Some(first) = lines.next() else {
            return Self {
                code: DEFAULT_ERROR_CODE,
                message: NO_REASON.to_string(),
            };
        };
        match first.trim().parse::<i32>() {
            Ok(code) => Self {
                code,
                message: lines.collect::<Vec<_>>().join("\n"),
            },
            Err(_) => Self {
                code: DEFAULT_ERROR_CODE,
                message: content.lines().collect::<Vec<_>>().join("\n"),
            },
        }
    }
}

impl fmt::Display for DaemonFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daemon failure {}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_first_line_becomes_code() {
        let failure = DaemonFailure::parse("42\nreason text");
        assert_eq!(failure.code, 42);
        assert_eq!(failure.message, "reason text");
    }

    #[test]
    fn multi_line_reason_is_joined_with_newlines() {
        let failure = DaemonFailure::parse("7\nfirst\nsecond");
        assert_eq!(failure.code, 7);
        assert_eq!(failure.message, "first\nsecond");
    }

    #[test]
    fn empty_file_defaults_code_and_message() {
        let failure = DaemonFailure::parse("");
        assert_eq!(failure.code, DEFAULT_ERROR_CODE);
        assert_eq!(failure.message, NO_REASON);
    }

    #[test]
    fn non_numeric_first_line_keeps_full_content() {
        let failure = DaemonFailure::parse("tape drive offline\nretry later");
        assert_eq!(failure.code, DEFAULT_ERROR_CODE);
        assert_eq!(failure.message, "tape drive offline\nretry later");
    }

    #[test]
    fn trailing_newline_does_not_change_the_message() {
        let failure = DaemonFailure::parse("42\nreason text\n");
        assert_eq!(failure.code, 42);
        assert_eq!(failure.message, "reason text");
    }
}
