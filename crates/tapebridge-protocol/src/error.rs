//! # Design
//!
//! - Constant-message errors with the offending input captured as a field.
//! - Protocol violations fail the one operation that hit them; callers decide
//!   how to surface the failure.

use thiserror::Error;

/// Result type for protocol parsing and rendering.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Violations of the file-based daemon protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A locator carried no query part at all.
    #[error("archive locator lacks a query part")]
    MissingQuery {
        /// The locator text in question.
        uri: String,
    },
    /// A locator query carried no `bfid` parameter.
    #[error("archive locator query lacks a bfid parameter")]
    MissingBfid {
        /// The locator text in question.
        uri: String,
    },
    /// A request descriptor could not be serialized.
    #[error("request descriptor serialization failed")]
    Descriptor {
        /// Underlying JSON error.
        #[source]
        source: DescriptorJsonError,
    },
}

/// Wrapper keeping [`ProtocolError`] cheaply comparable while preserving the
/// JSON error text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DescriptorJsonError {
    /// Rendered serde error message.
    pub message: String,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(source: serde_json::Error) -> Self {
        Self::Descriptor {
            source: DescriptorJsonError {
                message: source.to_string(),
            },
        }
    }
}
