//! Storage backend traits.

use crate::entry::LedgerEntry;
use crate::error::StoreError;

/// Sequential reader over stored ledger entries, oldest first.
pub trait StoreReader {
    /// Reads the next entry. `Ok(None)` at the end of the sequence.
    fn read_next(&mut self) -> Result<Option<LedgerEntry>, StoreError>;

    /// Drains the reader.
    fn read_all(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.read_next()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl<R: StoreReader + ?Sized> StoreReader for Box<R> {
    fn read_next(&mut self) -> Result<Option<LedgerEntry>, StoreError> {
        (**self).read_next()
    }
}

/// Append-only persistence for the ledger.
///
/// Implementations never mutate or remove an entry once `append` has
/// returned `Ok`. An `append` that returns `Err` must leave no trace of the
/// entry behind. The ledger serializes all calls to `append`.
pub trait LedgerBackend: Send + Sync {
    /// Opens a reader positioned at the first entry.
    fn reader(&self) -> Result<Box<dyn StoreReader + '_>, StoreError>;

    /// Durably appends one entry.
    fn append(&mut self, entry: &LedgerEntry) -> Result<(), StoreError>;

    /// Loads every stored entry.
    fn load(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        self.reader()?.read_all()
    }
}
