//! One-time-use nonce registry with TTL expiry and a background reaper.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use uuid::Uuid;

use sovereign_canonical::Nonce;

use crate::clock::{Clock, SystemClock};
use crate::errors::ReplayError;

/// Default nonce lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Default interval between reaper sweeps.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Registry state for one issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceRecord {
    /// The token.
    pub value: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// Whether the token has been consumed.
    pub consumed: bool,
}

struct Inner {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    registry: Mutex<HashMap<String, NonceRecord>>,
}

impl Inner {
    fn is_expired(&self, record: &NonceRecord, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative span; treat as fresh.
        match (now - record.issued_at).to_std() {
            Ok(elapsed) => elapsed > self.ttl,
            Err(_) => false,
        }
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut registry = self.registry.lock();
        let before = registry.len();
        registry.retain(|_, record| !self.is_expired(record, now));
        before - registry.len()
    }
}

/// Issues single-use anti-replay tokens and consumes them at most once.
///
/// The check "known, unexpired and unconsumed" and the transition to
/// consumed happen under one lock acquisition, so two racing validations of
/// the same token cannot both succeed. Clones share the same registry.
#[derive(Clone)]
pub struct NonceManager {
    inner: Arc<Inner>,
}

impl NonceManager {
    /// Creates a manager with the given TTL and clock.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                clock,
                registry: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a manager on wall-clock time.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// Configured lifetime of a token.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Issues a fresh token that has never been issued before.
    pub fn generate_nonce(&self) -> Nonce {
        let issued_at = self.inner.clock.now();
        let mut registry = self.inner.registry.lock();
        loop {
            let value = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = registry.entry(value.clone()) {
                slot.insert(NonceRecord {
                    value: value.clone(),
                    issued_at,
                    consumed: false,
                });
                tracing::debug!(nonce = %value, "issued nonce");
                return Nonce::new(value);
            }
        }
    }

    /// Consumes `token`, explaining any refusal.
    pub fn consume_nonce(&self, token: &str) -> Result<(), ReplayError> {
        let now = self.inner.clock.now();
        let mut registry = self.inner.registry.lock();

        let outcome = match registry.get_mut(token) {
            None => Err(ReplayError::Unknown(token.to_string())),
            Some(record) if record.consumed => {
                Err(ReplayError::AlreadyConsumed(token.to_string()))
            }
            Some(record) if self.inner.is_expired(record, now) => {
                Err(ReplayError::Expired(token.to_string()))
            }
            Some(record) => {
                record.consumed = true;
                Ok(())
            }
        };

        if let Err(ReplayError::Expired(_)) = &outcome {
            registry.remove(token);
        }
        drop(registry);

        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "nonce rejected");
        }
        outcome
    }

    /// Returns true exactly once per issued token, within its TTL.
    pub fn validate_nonce(&self, token: &str) -> bool {
        self.consume_nonce(token).is_ok()
    }

    /// Snapshot of a token's registry record.
    pub fn record(&self, token: &str) -> Option<NonceRecord> {
        self.inner.registry.lock().get(token).cloned()
    }

    /// Number of records currently held.
    pub fn outstanding(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Removes every record whose TTL has elapsed, consumed or not.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Starts a background thread that purges expired records every `interval`.
    ///
    /// The thread stops when the returned handle is dropped or shut down.
    pub fn spawn_reaper(&self, interval: Duration) -> std::io::Result<NonceReaper> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::Builder::new()
            .name("nonce-reaper".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let purged = inner.purge_expired();
                        if purged > 0 {
                            tracing::info!(purged, "reaped expired nonces");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(NonceReaper {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl std::fmt::Debug for NonceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceManager")
            .field("ttl", &self.inner.ttl)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Handle to the background reaper thread.
#[derive(Debug)]
pub struct NonceReaper {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl NonceReaper {
    /// Stops the reaper and waits for it to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NonceReaper {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
