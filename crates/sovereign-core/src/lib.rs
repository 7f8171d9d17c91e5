//! Event envelopes, signing, replay protection and fingerprints for the
//! Sovereign provenance chain.
//!
//! This crate provides:
//! - The event envelope and signed-event types fed into the ledger
//! - `EventSigner`: HMAC-SHA256 over canonical bytes, with key rotation
//! - `NonceManager`: single-use tokens with TTL expiry and a background reaper
//! - `ContextFingerprint`: hour-bucketed request-context digests
//! - `ProvenanceConfig`: TOML + environment configuration
//!
//! Core invariants:
//! - Signatures are a pure function of the canonical envelope and the key
//! - A nonce is consumed at most once, and never after its TTL
//! - Nothing here is global; callers own every service object
//!
#![deny(missing_docs)]

/// Time sources.
pub mod clock;
/// Configuration loading.
pub mod config;
/// Error types and stable error codes.
pub mod errors;
/// Envelope and signed-event types.
pub mod events;
/// Request-context fingerprints.
pub mod fingerprint;
/// Nonce registry.
pub mod nonce;
/// Event signing.
pub mod signer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LedgerConfig, NonceConfig, ProvenanceConfig, RetiredKey, SigningConfig};
pub use errors::{
    ConfigError, CoreError, ErrorCode, FingerprintError, ReplayError, SigningError,
};
pub use events::{Details, EventEnvelope, EventName, SignatureAlgorithm, SignedEvent};
pub use fingerprint::{hour_bucket, ContextFingerprint};
pub use nonce::{NonceManager, NonceReaper, NonceRecord, DEFAULT_REAP_INTERVAL, DEFAULT_TTL};
pub use signer::{EventSigner, KeyRing, SigningKey, MIN_KEY_LEN};
