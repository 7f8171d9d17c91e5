//! Canonical data model primitives for the Sovereign provenance chain.
//!
//! Every byte sequence that gets signed or hashed is produced here: event
//! envelopes are signed over their canonical form, ledger entries are chained
//! with the SHA-256 of the canonical signed event, and context fingerprints
//! hash a canonical object of normalized request fields.
//!
#![deny(missing_docs)]

/// Canonicalization helpers for deterministic hashing.
pub mod canonicalizer;
/// Digest primitives.
pub mod digest;
/// Identifier newtypes and timestamp helpers.
pub mod identifiers;
/// Validation errors used by canonical types.
pub mod validation;

pub use canonicalizer::{CanonicalizationError, Canonicalizer};
pub use digest::{sha256_hex, HexDigest, SHA256_HEX_LEN};
pub use identifiers::{entry_timestamp, AgentId, Jurisdiction, KeyId, Nonce, Timestamp, TraceId};
pub use validation::ValidationError;
