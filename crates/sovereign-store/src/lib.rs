//! Hash-chained provenance ledger for Sovereign events.
//!
//! This crate provides:
//! - `HashChainLedger`: the append-only, hash-linked sequence of signed events
//! - `LedgerBackend` and `StoreReader` traits, with journal-file and
//!   in-memory implementations
//! - Whole-chain verification that reports every violation
//! - Entry filtering for selective iteration
//! - `LineageTracer`: per-trace histories and recent-trace summaries
//! - `ProvenanceChain`: the owned service that signs, protects against
//!   replay and appends
//!
//! The chain hash of an entry is `sha256(canonical(signed_event))`; genesis
//! carries the literal `"genesis"` and a zero `prev_hash`.

#![deny(missing_docs)]

/// Provenance service.
pub mod chain;
/// Ledger entry type and hashing rule.
pub mod entry;
/// Error types for store operations.
pub mod error;
/// Entry filtering API.
pub mod filter;
/// Journal-backed storage implementation.
pub mod journal;
/// The hash-chained ledger.
pub mod ledger;
/// In-memory storage implementation.
pub mod memory;
/// Lineage queries.
pub mod tracer;
/// Storage backend traits.
pub mod traits;
/// Chain verification.
pub mod verification;

pub use chain::{EventDraft, ProvenanceChain, RecordReceipt};
pub use entry::{event_hash, LedgerEntry, GENESIS_HASH};
pub use error::{LedgerError, StoreError};
pub use filter::{
    AgentFilter, AndFilter, EntryFilter, EventNameFilter, FilteredReader, JurisdictionFilter,
    OrFilter, TimeRangeFilter, TraceFilter,
};
pub use journal::{JournalBackend, JournalEntryReader};
pub use ledger::{ChainStats, HashChainLedger, RetryPolicy};
pub use memory::MemoryBackend;
pub use sovereign_journal::{ReadMode, WriteOptions};
pub use tracer::{LineageTracer, TraceEvent, TraceHistory, TraceSummary};
pub use traits::{LedgerBackend, StoreReader};
pub use verification::{verify_entries, ChainReport, ChainViolation};
