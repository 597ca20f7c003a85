//! Checksum metadata carried by flush requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Checksum algorithms understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChecksumKind {
    /// Adler-32 rolling checksum.
    Adler32,
    /// MD5 digest.
    Md5,
    /// SHA-1 digest.
    Sha1,
}

impl ChecksumKind {
    /// Wire name of the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adler32 => "ADLER32",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checksum value paired with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    /// Algorithm that produced the value.
    pub kind: ChecksumKind,
    /// Hex-encoded digest.
    pub value: String,
}

impl Checksum {
    /// Pair an algorithm with its hex digest.
    #[must_use]
    pub fn new(kind: ChecksumKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
