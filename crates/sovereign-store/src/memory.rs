//! In-memory storage backend.

use crate::entry::LedgerEntry;
use crate::error::StoreError;
use crate::traits::{LedgerBackend, StoreReader};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<Value>,
    failures: VecDeque<io::ErrorKind>,
}

/// Ledger backend holding entries in memory, in their persisted JSON form.
///
/// Clones share the same storage, so a test can keep a handle after giving
/// the backend to a ledger and inspect, tamper with, or fail the store
/// behind the ledger's back.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with persisted entries.
    pub fn from_entries(entries: Vec<Value>) -> Self {
        let backend = Self::default();
        backend.state.lock().entries = entries;
        backend
    }

    /// Copy of the stored entries.
    pub fn snapshot(&self) -> Vec<Value> {
        self.state.lock().entries.clone()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Edits a stored entry in place, bypassing the ledger.
    ///
    /// Returns false when `position` is out of range.
    pub fn tamper<F>(&self, position: usize, edit: F) -> bool
    where
        F: FnOnce(&mut Value),
    {
        let mut state = self.state.lock();
        match state.entries.get_mut(position) {
            Some(entry) => {
                edit(entry);
                true
            }
            None => false,
        }
    }

    /// Makes the next append fail with an I/O error of `kind`.
    ///
    /// Calls queue up; each failing append consumes one.
    pub fn fail_next_append(&self, kind: io::ErrorKind) {
        self.state.lock().failures.push_back(kind);
    }
}

impl LedgerBackend for MemoryBackend {
    fn reader(&self) -> Result<Box<dyn StoreReader + '_>, StoreError> {
        Ok(Box::new(MemoryReader {
            entries: self.snapshot().into_iter(),
            position: 0,
        }))
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let json = serde_json::to_value(entry).map_err(StoreError::Encode)?;
        let mut state = self.state.lock();
        if let Some(kind) = state.failures.pop_front() {
            return Err(StoreError::Io(io::Error::new(kind, "injected append failure")));
        }
        state.entries.push(json);
        Ok(())
    }
}

struct MemoryReader {
    entries: std::vec::IntoIter<Value>,
    position: u64,
}

impl StoreReader for MemoryReader {
    fn read_next(&mut self) -> Result<Option<LedgerEntry>, StoreError> {
        let Some(json) = self.entries.next() else {
            return Ok(None);
        };
        let position = self.position;
        let entry = serde_json::from_value(json)
            .map_err(|source| StoreError::Decode { position, source })?;
        self.position += 1;
        Ok(Some(entry))
    }
}
