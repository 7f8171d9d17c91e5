//! Error types for store and ledger operations.

use sovereign_canonical::{CanonicalizationError, ValidationError};
use sovereign_core::{CoreError, ErrorCode, ReplayError, SigningError};
use sovereign_journal::JournalError;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Journal backend error.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    /// A stored entry does not match the ledger entry schema.
    #[error("malformed ledger entry at position {position}: {source}")]
    Decode {
        /// Position of the entry in the stored sequence.
        position: u64,
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// An entry could not be serialized for storage.
    #[error("failed to encode ledger entry: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    /// True for I/O failures that are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            StoreError::Journal(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Storage
    }
}

/// Errors raised by the hash-chained ledger and the services built on it.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backing store failed; the event was not recorded.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    /// The event was rejected before anything was persisted.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),
    /// Canonical bytes for hashing could not be produced.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    /// Signing or signature verification failed.
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
    /// A nonce was refused.
    #[error("replay rejected: {0}")]
    Replay(#[from] ReplayError),
    /// Any other core failure.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The stored sequence failed verification where a valid chain is required.
    #[error("chain integrity violated: {0}")]
    Integrity(String),
}

impl LedgerError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Storage(e) => e.code(),
            LedgerError::Validation(_) => ErrorCode::Validation,
            LedgerError::Canonicalization(_) => ErrorCode::Validation,
            LedgerError::Signing(e) => e.code(),
            LedgerError::Replay(e) => e.code(),
            LedgerError::Core(e) => e.code(),
            LedgerError::Integrity(_) => ErrorCode::Integrity,
        }
    }

    /// True when a retry of the same append may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn storage_errors_map_to_storage_code() {
        let err = LedgerError::from(StoreError::Io(io::Error::from(io::ErrorKind::NotFound)));
        assert_eq!(err.code().as_str(), "STORAGE_ERROR");
        assert!(!err.is_transient());
    }

    #[test]
    fn replay_and_validation_are_never_transient() {
        let replay = LedgerError::from(ReplayError::Unknown("n".into()));
        assert_eq!(replay.code(), ErrorCode::Replay);
        assert!(!replay.is_transient());

        let invalid = LedgerError::from(ValidationError::MissingField { field: "nonce" });
        assert_eq!(invalid.code(), ErrorCode::Validation);
    }

    #[test]
    fn journal_interruptions_are_transient() {
        let err = StoreError::Journal(JournalError::Io(io::Error::from(
            io::ErrorKind::Interrupted,
        )));
        assert!(err.is_transient());
    }
}
