use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;

use crate::validation::ValidationError;

/// Number of hex characters in a SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// SHA-256 digest rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    /// Parses a validated lowercase hex digest.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let re = Regex::new(r"^[0-9a-f]{64}$").expect("invalid regex");
        if !re.is_match(&value) {
            return Err(ValidationError::PatternMismatch {
                field: "digest",
                value,
            });
        }
        Ok(Self(value))
    }

    /// The all-zero digest that anchors the genesis entry.
    pub fn zero() -> Self {
        Self("0".repeat(SHA256_HEX_LEN))
    }

    /// Borrows the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the digest, returning the hex string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for HexDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes `bytes` with SHA-256 and returns the lowercase hex digest.
pub fn sha256_hex(bytes: &[u8]) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    HexDigest(hex::encode(hasher.finalize()))
}
