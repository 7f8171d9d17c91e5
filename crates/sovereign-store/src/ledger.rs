//! The hash-chained, append-only ledger.

use crate::entry::{event_hash, LedgerEntry};
use crate::error::LedgerError;
use crate::filter::{EntryFilter, FilteredReader};
use crate::traits::{LedgerBackend, StoreReader};
use crate::verification::{verify_entries, ChainReport};
use parking_lot::RwLock;
use serde::Serialize;
use sovereign_canonical::{entry_timestamp, Canonicalizer, ValidationError};
use sovereign_core::{Clock, SignedEvent, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Bounds retries of transient storage failures around an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the second attempt; grows linearly after that.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Chain length and the derived event count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    /// Entries in the chain, genesis included.
    pub chain_length: u64,
    /// Recorded events, genesis excluded.
    pub total_events: u64,
}

struct LedgerState<B> {
    backend: B,
    next_index: u64,
    tail_hash: String,
}

/// Append-only sequence of signed events, each linked to its predecessor
/// by hash.
///
/// Appends are serialized by a write lock held across the whole
/// read-tail, hash, persist cycle, so no two appends can observe the same
/// tail. Reads take the shared lock and re-read the backend, so they never
/// see a half-written entry.
///
/// # Example
///
/// ```rust,no_run
/// use sovereign_store::{HashChainLedger, MemoryBackend};
///
/// let ledger = HashChainLedger::open(MemoryBackend::new())?;
/// assert_eq!(ledger.get_chain_length(), 1);
/// assert!(ledger.verify_chain_integrity()?);
/// # Ok::<(), sovereign_store::LedgerError>(())
/// ```
pub struct HashChainLedger<B: LedgerBackend> {
    state: RwLock<LedgerState<B>>,
    canonicalizer: Canonicalizer,
    clock: Arc<dyn Clock>,
}

impl<B: LedgerBackend> HashChainLedger<B> {
    /// Loads the ledger from `backend`, writing genesis if it is empty.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be read, holds entries that do not
    /// parse, or the genesis entry cannot be written.
    pub fn open(backend: B) -> Result<Self, LedgerError> {
        Self::open_with_clock(backend, Arc::new(SystemClock))
    }

    /// Like [`HashChainLedger::open`], stamping entries from `clock`.
    pub fn open_with_clock(mut backend: B, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let entries = backend.load()?;
        let (next_index, tail_hash) = match entries.last() {
            Some(tail) => (entries.len() as u64, tail.event_hash.clone()),
            None => {
                let genesis = LedgerEntry::genesis(entry_timestamp(clock.now()));
                backend.append(&genesis)?;
                tracing::info!("created genesis entry");
                (1, genesis.event_hash)
            }
        };
        Ok(Self::from_tail(backend, next_index, tail_hash, clock))
    }

    /// Loads a ledger that must already hold its genesis entry.
    ///
    /// Never writes to `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Integrity`] for an empty backend, and fails
    /// like [`HashChainLedger::open`] when the entries cannot be read.
    pub fn open_existing(backend: B) -> Result<Self, LedgerError> {
        let entries = backend.load()?;
        let Some(tail) = entries.last() else {
            return Err(LedgerError::Integrity("ledger has no genesis entry".to_string()));
        };
        let (next_index, tail_hash) = (entries.len() as u64, tail.event_hash.clone());
        Ok(Self::from_tail(backend, next_index, tail_hash, Arc::new(SystemClock)))
    }

    fn from_tail(backend: B, next_index: u64, tail_hash: String, clock: Arc<dyn Clock>) -> Self {
        tracing::info!(chain_length = next_index, "ledger opened");

        Self {
            state: RwLock::new(LedgerState {
                backend,
                next_index,
                tail_hash,
            }),
            canonicalizer: Canonicalizer::new(),
            clock,
        }
    }

    /// Appends `signed` and returns the index of its new entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for a malformed event (nothing is
    /// written) and [`LedgerError::Storage`] when the backend did not
    /// durably record the entry. The chain tail is unchanged on error.
    pub fn append_event(&self, signed: SignedEvent) -> Result<u64, LedgerError> {
        signed.event.validate()?;
        signed.key_id.validate()?;
        if signed.signature.is_empty() {
            return Err(ValidationError::MissingField { field: "signature" }.into());
        }

        let mut state = self.state.write();
        let hash = event_hash(&self.canonicalizer, &signed)?;
        let entry = LedgerEntry {
            index: state.next_index,
            timestamp: entry_timestamp(self.clock.now()),
            event_hash: hash.into_string(),
            prev_hash: state.tail_hash.clone(),
            signed_event: Some(signed),
        };

        if let Err(e) = state.backend.append(&entry) {
            tracing::error!(index = entry.index, error = %e, "ledger append failed");
            return Err(e.into());
        }

        state.next_index += 1;
        tracing::debug!(
            index = entry.index,
            event_hash = %entry.event_hash,
            trace_id = entry.trace_id().unwrap_or_default(),
            "appended event"
        );
        state.tail_hash = entry.event_hash;
        Ok(entry.index)
    }

    /// [`HashChainLedger::append_event`], retrying transient I/O failures.
    ///
    /// Validation and all non-transient storage errors are returned at once.
    pub fn append_event_with_retry(
        &self,
        signed: SignedEvent,
        policy: RetryPolicy,
    ) -> Result<u64, LedgerError> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.append_event(signed.clone()) {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(attempt, error = %e, "transient append failure; retrying");
                    std::thread::sleep(policy.backoff * attempt);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Entry at `index`, or `None` past the end.
    pub fn get_entry(&self, index: u64) -> Result<Option<LedgerEntry>, LedgerError> {
        let state = self.state.read();
        if index >= state.next_index {
            return Ok(None);
        }
        let mut reader = state.backend.reader()?;
        let mut position = 0;
        while let Some(entry) = reader.read_next()? {
            if position == index {
                return Ok(Some(entry));
            }
            position += 1;
        }
        Ok(None)
    }

    /// Every entry, genesis first.
    pub fn get_all_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.read();
        Ok(state.backend.load()?)
    }

    /// Entries matching `filter`, in chain order.
    pub fn query<F: EntryFilter>(&self, filter: F) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.read();
        let reader = state.backend.reader()?;
        let entries = FilteredReader::new(reader, filter).read_all()?;
        Ok(entries)
    }

    /// Re-derives every hash and link, reporting all violations.
    pub fn verify_chain_report(&self) -> Result<ChainReport, LedgerError> {
        let entries = self.get_all_entries()?;
        let report = verify_entries(&self.canonicalizer, &entries);
        for violation in &report.violations {
            tracing::warn!(%violation, "chain violation");
        }
        Ok(report)
    }

    /// True when every hash and link in the chain checks out.
    pub fn verify_chain_integrity(&self) -> Result<bool, LedgerError> {
        Ok(self.verify_chain_report()?.is_valid())
    }

    /// Entries in the chain, genesis included.
    pub fn get_chain_length(&self) -> u64 {
        self.state.read().next_index
    }

    /// Chain length and event count.
    pub fn stats(&self) -> ChainStats {
        let chain_length = self.get_chain_length();
        ChainStats {
            chain_length,
            total_events: chain_length.saturating_sub(1),
        }
    }
}

impl<B: LedgerBackend> std::fmt::Debug for HashChainLedger<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashChainLedger")
            .field("chain_length", &self.get_chain_length())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use chrono::{TimeZone, Utc};
    use sovereign_canonical::{AgentId, Jurisdiction, KeyId, Nonce, Timestamp, TraceId};
    use sovereign_core::{Details, EventEnvelope, EventName, ManualClock, SignatureAlgorithm};
    use std::io;

    fn signed(trace: &str, nonce: &str) -> SignedEvent {
        SignedEvent {
            event: EventEnvelope {
                trace_id: TraceId::new(trace),
                timestamp: Timestamp::new("2025-01-01T12:00:00Z"),
                agent_id: AgentId::new("test_agent"),
                jurisdiction: Jurisdiction::new("global"),
                event_name: EventName::QueryReceived,
                request_hash: "req".to_string(),
                nonce: Nonce::new(nonce),
                details: Details::new(),
            },
            signature: "ab".repeat(32),
            algorithm: SignatureAlgorithm::HmacSha256,
            key_id: KeyId::new("v1"),
        }
    }

    #[test]
    fn open_writes_genesis_once() {
        let backend = MemoryBackend::new();
        let ledger = HashChainLedger::open(backend.clone()).unwrap();
        assert_eq!(ledger.get_chain_length(), 1);
        drop(ledger);

        let reopened = HashChainLedger::open(backend.clone()).unwrap();
        assert_eq!(reopened.get_chain_length(), 1);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn append_links_to_tail() {
        let ledger = HashChainLedger::open(MemoryBackend::new()).unwrap();
        assert_eq!(ledger.append_event(signed("T1", "n1")).unwrap(), 1);
        assert_eq!(ledger.append_event(signed("T1", "n2")).unwrap(), 2);

        let first = ledger.get_entry(1).unwrap().unwrap();
        let second = ledger.get_entry(2).unwrap().unwrap();
        assert_eq!(first.prev_hash, "genesis");
        assert_eq!(second.prev_hash, first.event_hash);
        assert!(ledger.get_entry(3).unwrap().is_none());
        assert!(ledger.verify_chain_integrity().unwrap());
    }

    #[test]
    fn entry_timestamps_come_from_clock() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let clock = ManualClock::new(start);
        let ledger =
            HashChainLedger::open_with_clock(MemoryBackend::new(), Arc::new(clock.clone()))
                .unwrap();
        clock.advance(chrono::Duration::milliseconds(1500));
        ledger.append_event(signed("T1", "n1")).unwrap();

        let entries = ledger.get_all_entries().unwrap();
        assert_eq!(entries[0].timestamp, "2025-03-01T08:30:00.000000Z");
        assert_eq!(entries[1].timestamp, "2025-03-01T08:30:01.500000Z");
    }

    #[test]
    fn invalid_event_is_rejected_before_storage() {
        let backend = MemoryBackend::new();
        let ledger = HashChainLedger::open(backend.clone()).unwrap();

        let mut missing_nonce = signed("T1", "n1");
        missing_nonce.event.nonce = Nonce::new("");
        assert!(matches!(
            ledger.append_event(missing_nonce),
            Err(LedgerError::Validation(_))
        ));

        let mut unsigned = signed("T1", "n1");
        unsigned.signature.clear();
        assert!(matches!(
            ledger.append_event(unsigned),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(backend.len(), 1);
        assert_eq!(ledger.get_chain_length(), 1);
    }

    #[test]
    fn storage_failure_propagates_and_keeps_tail() {
        let backend = MemoryBackend::new();
        let ledger = HashChainLedger::open(backend.clone()).unwrap();
        backend.fail_next_append(io::ErrorKind::PermissionDenied);

        let err = ledger.append_event(signed("T1", "n1")).unwrap_err();
        assert_eq!(err.code().as_str(), "STORAGE_ERROR");
        assert_eq!(ledger.get_chain_length(), 1);

        assert_eq!(ledger.append_event(signed("T1", "n2")).unwrap(), 1);
        assert!(ledger.verify_chain_integrity().unwrap());
    }

    #[test]
    fn retry_recovers_from_transient_failures() {
        let backend = MemoryBackend::new();
        let ledger = HashChainLedger::open(backend.clone()).unwrap();
        backend.fail_next_append(io::ErrorKind::Interrupted);
        backend.fail_next_append(io::ErrorKind::TimedOut);

        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        };
        assert_eq!(
            ledger.append_event_with_retry(signed("T1", "n1"), policy).unwrap(),
            1
        );
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn retry_gives_up_on_permanent_failures() {
        let backend = MemoryBackend::new();
        let ledger = HashChainLedger::open(backend.clone()).unwrap();
        backend.fail_next_append(io::ErrorKind::PermissionDenied);
        backend.fail_next_append(io::ErrorKind::PermissionDenied);

        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(1),
        };
        assert!(ledger.append_event_with_retry(signed("T1", "n1"), policy).is_err());
        // only one attempt consumed one injected failure
        assert!(ledger.append_event(signed("T1", "n2")).is_err());
        assert_eq!(ledger.append_event(signed("T1", "n3")).unwrap(), 1);
    }

    #[test]
    fn stats_exclude_genesis() {
        let ledger = HashChainLedger::open(MemoryBackend::new()).unwrap();
        ledger.append_event(signed("T1", "n1")).unwrap();
        assert_eq!(
            ledger.stats(),
            ChainStats {
                chain_length: 2,
                total_events: 1
            }
        );
    }

    #[test]
    fn open_existing_refuses_empty_store() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            HashChainLedger::open_existing(backend.clone()),
            Err(LedgerError::Integrity(_))
        ));
        assert!(backend.is_empty());

        HashChainLedger::open(backend.clone()).unwrap();
        let ledger = HashChainLedger::open_existing(backend.clone()).unwrap();
        assert_eq!(ledger.get_chain_length(), 1);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn unparseable_store_fails_open() {
        let backend = MemoryBackend::from_entries(vec![serde_json::json!({"index": "zero"})]);
        assert!(matches!(
            HashChainLedger::open(backend),
            Err(LedgerError::Storage(_))
        ));
    }
}
