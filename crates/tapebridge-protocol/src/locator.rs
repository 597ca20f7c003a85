//! Archive locator syntax.
//!
//! A completed migration is identified by a URI-like locator of the form
//! `<type>://<name>/?bfid=<content-id>`. The scheme and authority name the
//! storage instance; `bfid` is the only query parameter the delete path ever
//! consumes. Locators are treated as opaque text once issued: deletion
//! extracts `bfid` from whatever string was handed back, without requiring
//! the string to round-trip through [`ArchiveLocator`].

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// Locator for a file archived on tertiary storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveLocator {
    /// Storage type, rendered as the URI scheme.
    pub storage_type: String,
    /// Storage instance name, rendered as the URI authority.
    pub storage_name: String,
    /// Opaque identifier the daemon uses to find the archived copy.
    pub bfid: String,
}

impl ArchiveLocator {
    /// Build a locator for the given storage instance and content id.
    #[must_use]
    pub fn new(
        storage_type: impl Into<String>,
        storage_name: impl Into<String>,
        bfid: impl Into<String>,
    ) -> Self {
        Self {
            storage_type: storage_type.into(),
            storage_name: storage_name.into(),
            bfid: bfid.into(),
        }
    }
}

impl fmt::Display for ArchiveLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/?bfid={}",
            self.storage_type, self.storage_name, self.bfid
        )
    }
}

/// Extract the `bfid` query parameter from a locator string.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingQuery`] when the locator carries no query
/// part and [`ProtocolError::MissingBfid`] when the query lacks the `bfid`
/// parameter.
pub fn bfid_from_uri(uri: &str) -> ProtocolResult<String> {
    let query = uri
        .split_once('?')
        .map(|(_, query)| query)
        .filter(|query| !query.is_empty())
        .ok_or_else(|| ProtocolError::MissingQuery {
            uri: uri.to_string(),
        })?;
    query
        .split('&')
        .find_map(|pair| match pair.split_once('=') {
            Some(("bfid", value)) if !value.is_empty() => Some(value.to_string()),
            _ => None,
        })
        .ok_or_else(|| ProtocolError::MissingBfid {
            uri: uri.to_string(),
        })
}
