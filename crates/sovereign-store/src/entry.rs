//! The persisted ledger entry and its hashing rule.

use serde::{Deserialize, Serialize};
use sovereign_canonical::{sha256_hex, CanonicalizationError, Canonicalizer, HexDigest};
use sovereign_core::SignedEvent;

/// Sentinel `event_hash` of the genesis entry. Not a computed hash.
pub const GENESIS_HASH: &str = "genesis";

/// One immutable, indexed record of the ledger.
///
/// Serializes to the persisted form
/// `{index, timestamp, event_hash, prev_hash, signed_event}`, with
/// `signed_event` null only for the genesis entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerEntry {
    /// Position in the chain; genesis is 0.
    pub index: u64,
    /// UTC time the entry was appended, microsecond precision.
    pub timestamp: String,
    /// `sha256(canonical(signed_event))`, or `"genesis"`.
    pub event_hash: String,
    /// `event_hash` of the previous entry; 64 zeros for genesis.
    pub prev_hash: String,
    /// The recorded event.
    pub signed_event: Option<SignedEvent>,
}

impl LedgerEntry {
    /// Builds the genesis entry anchoring a new chain.
    pub fn genesis(timestamp: String) -> Self {
        Self {
            index: 0,
            timestamp,
            event_hash: GENESIS_HASH.to_string(),
            prev_hash: HexDigest::zero().into_string(),
            signed_event: None,
        }
    }

    /// True for an entry shaped exactly like genesis.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
            && self.event_hash == GENESIS_HASH
            && self.prev_hash == HexDigest::zero().as_str()
            && self.signed_event.is_none()
    }

    /// Trace of the recorded event, if any.
    pub fn trace_id(&self) -> Option<&str> {
        self.signed_event.as_ref().map(|s| s.event.trace_id.as_str())
    }
}

/// Computes the chain hash of a signed event.
///
/// This is the only hashing rule the ledger uses, for appends and for
/// verification alike.
pub fn event_hash(
    canonicalizer: &Canonicalizer,
    signed: &SignedEvent,
) -> Result<HexDigest, CanonicalizationError> {
    let bytes = canonicalizer.canonicalize_serializable(signed)?;
    Ok(sha256_hex(&bytes))
}
