//! The provenance service tying signer, nonces, fingerprints and ledger
//! together.

use crate::error::LedgerError;
use crate::journal::JournalBackend;
use crate::ledger::{HashChainLedger, RetryPolicy};
use crate::tracer::LineageTracer;
use crate::traits::LedgerBackend;
use serde::Serialize;
use sovereign_canonical::{AgentId, Canonicalizer, Jurisdiction, Nonce, Timestamp, TraceId};
use sovereign_core::{
    Clock, ContextFingerprint, CoreError, Details, EventEnvelope, EventName, EventSigner,
    NonceManager, NonceReaper, ProvenanceConfig, SigningError, SystemClock,
};
use sovereign_journal::WriteOptions;
use std::sync::Arc;
use std::time::Duration;

/// An event a caller wants recorded, before nonce, timestamp and signature.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    /// Trace the event belongs to.
    pub trace_id: TraceId,
    /// Emitting component.
    pub agent_id: AgentId,
    /// Jurisdiction context; `global` by default.
    pub jurisdiction: Jurisdiction,
    /// Event type.
    pub event_name: EventName,
    /// Correlation hash; derived from the request context when absent.
    pub request_hash: Option<String>,
    /// Request text fed to the fingerprint.
    pub query_text: Option<String>,
    /// User fed to the fingerprint.
    pub user_id: Option<String>,
    /// Event-specific data.
    pub details: Details,
}

impl EventDraft {
    /// Starts a draft in the `global` jurisdiction with no details.
    pub fn new(trace_id: TraceId, agent_id: AgentId, event_name: EventName) -> Self {
        Self {
            trace_id,
            agent_id,
            jurisdiction: Jurisdiction::new("global"),
            event_name,
            request_hash: None,
            query_text: None,
            user_id: None,
            details: Details::new(),
        }
    }

    /// Sets the jurisdiction.
    pub fn jurisdiction(mut self, jurisdiction: Jurisdiction) -> Self {
        self.jurisdiction = jurisdiction;
        self
    }

    /// Uses `hash` as the request hash instead of a fingerprint.
    pub fn request_hash(mut self, hash: impl Into<String>) -> Self {
        self.request_hash = Some(hash.into());
        self
    }

    /// Sets the request context fingerprinted into the request hash.
    pub fn context(mut self, query_text: impl Into<String>, user_id: Option<String>) -> Self {
        self.query_text = Some(query_text.into());
        self.user_id = user_id;
        self
    }

    /// Adds one detail.
    pub fn detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// What [`ProvenanceChain::record`] wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReceipt {
    /// Ledger index of the new entry.
    pub index: u64,
    /// Nonce embedded in the event.
    pub nonce: Nonce,
    /// Request hash embedded in the event.
    pub request_hash: String,
}

/// Owned provenance service: one per process, passed by handle to every
/// emitter.
///
/// Recording an event issues a nonce, stamps the time, signs the envelope
/// and appends it to the ledger. Envelopes built elsewhere go through
/// [`ProvenanceChain::submit`], which consumes their nonce first so a
/// replayed envelope is refused before it is signed.
pub struct ProvenanceChain<B: LedgerBackend> {
    signer: EventSigner,
    nonces: NonceManager,
    fingerprint: ContextFingerprint,
    ledger: Arc<HashChainLedger<B>>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    reap_interval: Duration,
}

impl<B: LedgerBackend> ProvenanceChain<B> {
    /// Assembles a service from its parts, reading time from the system clock.
    pub fn new(signer: EventSigner, nonces: NonceManager, ledger: Arc<HashChainLedger<B>>) -> Self {
        Self::with_clock(signer, nonces, ledger, Arc::new(SystemClock))
    }

    /// Like [`ProvenanceChain::new`], with an explicit clock.
    pub fn with_clock(
        signer: EventSigner,
        nonces: NonceManager,
        ledger: Arc<HashChainLedger<B>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signer,
            nonces,
            fingerprint: ContextFingerprint::new(Arc::clone(&clock)),
            ledger,
            clock,
            retry: RetryPolicy::default(),
            reap_interval: sovereign_core::DEFAULT_REAP_INTERVAL,
        }
    }

    /// Replaces the retry policy used for appends.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the nonce reaper interval.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Records a draft and returns where it landed.
    ///
    /// # Errors
    ///
    /// Validation and signing errors leave the ledger untouched; storage
    /// errors are surfaced after the retry policy is exhausted.
    pub fn record(&self, draft: EventDraft) -> Result<RecordReceipt, LedgerError> {
        let request_hash = match draft.request_hash {
            Some(hash) => hash,
            None => self.derive_request_hash(&draft)?,
        };
        let nonce = self.nonces.generate_nonce();
        let envelope = EventEnvelope {
            trace_id: draft.trace_id,
            timestamp: Timestamp::from_datetime(self.clock.now()),
            agent_id: draft.agent_id,
            jurisdiction: draft.jurisdiction,
            event_name: draft.event_name,
            request_hash: request_hash.clone(),
            nonce: nonce.clone(),
            details: draft.details,
        };
        let index = self.submit(envelope)?;
        Ok(RecordReceipt {
            index,
            nonce,
            request_hash,
        })
    }

    /// Records a caller-built envelope whose nonce came from
    /// [`ProvenanceChain::issue_nonce`].
    ///
    /// The envelope is validated, then its nonce consumed; a malformed
    /// envelope does not burn its nonce.
    pub fn submit(&self, envelope: EventEnvelope) -> Result<u64, LedgerError> {
        envelope.validate()?;
        if let Err(e) = self.nonces.consume_nonce(envelope.nonce.as_str()) {
            tracing::warn!(trace_id = %envelope.trace_id, error = %e, "replay rejected");
            return Err(e.into());
        }
        let signed = self.signer.sign_event(envelope)?;
        self.ledger.append_event_with_retry(signed, self.retry)
    }

    /// Issues a nonce for an envelope built outside [`ProvenanceChain::record`].
    pub fn issue_nonce(&self) -> Nonce {
        self.nonces.generate_nonce()
    }

    /// Indices of entries whose signature does not verify under the key ring.
    ///
    /// Entries signed with a key the ring no longer holds count as failures.
    pub fn verify_signatures(&self) -> Result<Vec<u64>, LedgerError> {
        let mut failures = Vec::new();
        for entry in self.ledger.get_all_entries()? {
            let Some(signed) = &entry.signed_event else {
                continue;
            };
            match self.signer.verify_signature(signed) {
                Ok(true) => {}
                Ok(false) | Err(SigningError::UnknownKey(_)) => {
                    tracing::warn!(index = entry.index, "signature does not verify");
                    failures.push(entry.index);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(failures)
    }

    /// Starts the background nonce reaper at the configured interval.
    pub fn spawn_reaper(&self) -> std::io::Result<NonceReaper> {
        self.nonces.spawn_reaper(self.reap_interval)
    }

    /// A tracer over this service's ledger.
    pub fn tracer(&self) -> LineageTracer<B> {
        LineageTracer::new(Arc::clone(&self.ledger))
    }

    /// Shared handle on the ledger.
    pub fn ledger(&self) -> &Arc<HashChainLedger<B>> {
        &self.ledger
    }

    /// The nonce registry.
    pub fn nonces(&self) -> &NonceManager {
        &self.nonces
    }

    /// The event signer.
    pub fn signer(&self) -> &EventSigner {
        &self.signer
    }

    fn derive_request_hash(&self, draft: &EventDraft) -> Result<String, LedgerError> {
        let query_text = match &draft.query_text {
            Some(text) => text.clone(),
            None => {
                let bytes = Canonicalizer::new().canonicalize_serializable(&draft.details)?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };
        let digest = self
            .fingerprint
            .generate_fingerprint(
                &query_text,
                draft.user_id.as_deref(),
                draft.jurisdiction.as_str(),
                None,
            )
            .map_err(CoreError::from)?;
        Ok(digest.into_string())
    }
}

impl ProvenanceChain<JournalBackend> {
    /// Builds the whole service from configuration: key ring, nonce TTL and
    /// the journal-backed ledger at `ledger.path`.
    pub fn from_config(config: &ProvenanceConfig) -> Result<Self, LedgerError> {
        let keys = config.key_ring().map_err(CoreError::from)?;
        let backend = JournalBackend::open(
            &config.ledger.path,
            WriteOptions {
                sync: config.ledger.sync,
                create: true,
            },
        )?;
        let ledger = Arc::new(HashChainLedger::open(backend)?);
        let nonces = NonceManager::with_ttl(config.nonce.ttl());
        Ok(Self::new(EventSigner::new(keys), nonces, ledger)
            .with_reap_interval(config.nonce.reap_interval()))
    }
}

impl<B: LedgerBackend> std::fmt::Debug for ProvenanceChain<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceChain")
            .field("ledger", &self.ledger)
            .field("nonces", &self.nonces)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
