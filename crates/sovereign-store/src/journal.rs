//! Journal-backed storage implementation.

use crate::entry::LedgerEntry;
use crate::error::StoreError;
use crate::traits::{LedgerBackend, StoreReader};
use sovereign_journal::{JournalReader, JournalWriter, ReadMode, WriteOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Ledger backend persisting entries to a framed journal file.
///
/// One writer handle is held open for the life of the backend; every read
/// opens a fresh strict reader so it sees exactly the frames that were
/// durably appended before it started. A backend opened with
/// [`JournalBackend::open_read_only`] holds no writer and rejects appends.
pub struct JournalBackend {
    path: PathBuf,
    writer: Option<JournalWriter>,
}

impl JournalBackend {
    /// Opens the journal at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened or is not a
    /// ledger journal.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let writer = JournalWriter::open(&path, options)?;
        tracing::debug!(path = %path.display(), "opened journal backend");
        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    /// Opens a journal that must already exist.
    pub fn open_existing<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, StoreError> {
        Self::open(
            path,
            WriteOptions {
                sync,
                create: false,
            },
        )
    }

    /// Opens an existing journal without a writer.
    ///
    /// The header is validated up front; the file is never written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file is missing or is not a ledger
    /// journal.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        JournalEntryReader::open(&path)?;
        tracing::debug!(path = %path.display(), "opened journal backend read-only");
        Ok(Self { path, writer: None })
    }

    /// True when the backend was opened without a writer.
    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for JournalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LedgerBackend for JournalBackend {
    fn reader(&self) -> Result<Box<dyn StoreReader + '_>, StoreError> {
        Ok(Box::new(JournalEntryReader::open(&self.path)?))
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "journal opened read-only",
            )
            .into());
        };
        let json = serde_json::to_value(entry).map_err(StoreError::Encode)?;
        writer.append_entry(&json)?;
        Ok(())
    }
}

/// Strict reader decoding journal frames into ledger entries.
#[derive(Debug)]
pub struct JournalEntryReader {
    reader: JournalReader,
    position: u64,
}

impl JournalEntryReader {
    /// Opens a strict reader over the journal at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            reader: JournalReader::open(path, ReadMode::Strict)?,
            position: 0,
        })
    }
}

impl StoreReader for JournalEntryReader {
    fn read_next(&mut self) -> Result<Option<LedgerEntry>, StoreError> {
        let Some(json) = self.reader.read_entry()? else {
            return Ok(None);
        };
        let position = self.position;
        let entry = serde_json::from_value(json)
            .map_err(|source| StoreError::Decode { position, source })?;
        self.position += 1;
        Ok(Some(entry))
    }
}
