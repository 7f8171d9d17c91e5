//! Error types and stable error codes.

use sovereign_canonical::{CanonicalizationError, ValidationError};
use thiserror::Error;

/// Stable, externally visible error codes.
///
/// The gateway maps these to responses: validation and replay errors are
/// rejected, storage errors may be retried, integrity errors raise alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Envelope missing a field or malformed.
    Validation,
    /// Nonce unknown, expired or already consumed.
    Replay,
    /// Hash or linkage mismatch in the chain.
    Integrity,
    /// Backing store unreachable or write not durable.
    Storage,
    /// Key material or signature problem.
    Signing,
    /// Configuration could not be loaded.
    Config,
}

impl ErrorCode {
    /// Wire form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Replay => "REPLAY_ERROR",
            ErrorCode::Integrity => "INTEGRITY_ERROR",
            ErrorCode::Storage => "STORAGE_ERROR",
            ErrorCode::Signing => "SIGNING_ERROR",
            ErrorCode::Config => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while signing or verifying events.
#[derive(Error, Debug)]
pub enum SigningError {
    /// Envelope failed validation; nothing was signed.
    #[error("invalid envelope: {0}")]
    Validation(#[from] ValidationError),
    /// Canonical bytes could not be produced.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    /// No key with this id is in the ring.
    #[error("unknown signing key '{0}'")]
    UnknownKey(String),
    /// Key material is shorter than the accepted minimum.
    #[error("signing key '{key_id}' is too short ({len} bytes)")]
    WeakKey {
        /// Offending key.
        key_id: String,
        /// Actual length in bytes.
        len: usize,
    },
    /// Key material could not be decoded.
    #[error("signing key '{key_id}' is not valid: {reason}")]
    KeyEncoding {
        /// Offending key.
        key_id: String,
        /// Decoder message.
        reason: String,
    },
}

impl SigningError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SigningError::Validation(_) => ErrorCode::Validation,
            _ => ErrorCode::Signing,
        }
    }
}

/// Why a nonce was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// The token was never issued, or was already purged.
    #[error("nonce '{0}' is unknown")]
    Unknown(String),
    /// The token's TTL elapsed before it was presented.
    #[error("nonce '{0}' has expired")]
    Expired(String),
    /// The token was already consumed once.
    #[error("nonce '{0}' was already consumed")]
    AlreadyConsumed(String),
}

impl ReplayError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Replay
    }
}

/// Errors from context fingerprinting.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// The supplied timestamp is not ISO-8601.
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    /// Canonical bytes could not be produced.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl FingerprintError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment override carries an invalid value.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Parse failure.
        reason: String,
    },
    /// No signing key was configured.
    #[error("no signing key configured (set signing.key_hex or SOVEREIGN_SIGNING_KEY)")]
    MissingSigningKey,
    /// Key material is present but unusable.
    #[error("signing key rejected: {0}")]
    Key(#[from] SigningError),
    /// A configured value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Config
    }
}

/// Umbrella error for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Envelope validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Nonce refused.
    #[error("replay rejected: {0}")]
    Replay(#[from] ReplayError),
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
    /// Fingerprinting failed.
    #[error("fingerprint failed: {0}")]
    Fingerprint(#[from] FingerprintError),
    /// Configuration failed.
    #[error("configuration failed: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Validation(_) => ErrorCode::Validation,
            CoreError::Replay(e) => e.code(),
            CoreError::Signing(e) => e.code(),
            CoreError::Fingerprint(e) => e.code(),
            CoreError::Config(e) => e.code(),
        }
    }
}
