//! Journal writer implementation.

use crate::errors::JournalError;
use crate::frame::{FrameKind, JournalHeader, RecordFrame, HEADER_SIZE};
use crate::EntryJson;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Options for journal writing.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Whether to fsync after each append (default: true).
    pub sync: bool,
    /// Whether to create the file if it doesn't exist (default: true).
    pub create: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: true,
            create: true,
        }
    }
}

/// Append-only writer for ledger journals.
///
/// Every append either lands completely or not at all: if a write fails
/// part-way, the file is truncated back to its previous length before the
/// error is returned.
///
/// # Example
///
/// ```rust,no_run
/// use sovereign_journal::{JournalWriter, WriteOptions};
/// use serde_json::json;
///
/// let mut writer = JournalWriter::open("ledger.spl", WriteOptions::default())?;
/// writer.append_entry(&json!({"index": 0}))?;
/// writer.finish()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct JournalWriter {
    file: File,
    sync: bool,
    end: u64,
}

impl JournalWriter {
    /// Opens or creates a journal for appending.
    ///
    /// An empty file receives a fresh header. An existing file must carry a
    /// valid header; writes always go to its end.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if the file cannot be opened, is not a
    /// journal, or an I/O error occurs.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, JournalError> {
        let mut file = OpenOptions::new()
            .create(options.create)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(&JournalHeader::new().to_bytes())?;
            file.flush()?;
            if options.sync {
                file.sync_all()?;
            }
        } else if len < HEADER_SIZE as u64 {
            return Err(JournalError::FileNotEmpty);
        } else {
            let mut header = [0u8; HEADER_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            JournalHeader::from_bytes(&header)?;
        }

        let end = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            sync: options.sync,
            end,
        })
    }

    /// Byte length of the journal after the last successful append.
    pub fn len(&self) -> u64 {
        self.end
    }

    /// True when the journal holds only its header.
    pub fn is_empty(&self) -> bool {
        self.end <= HEADER_SIZE as u64
    }

    /// Appends one ledger entry as an `EntryJson` frame.
    pub fn append_entry(&mut self, entry: &EntryJson) -> Result<(), JournalError> {
        let payload = serde_json::to_vec(entry)?;
        self.append_raw(FrameKind::EntryJson, &payload)
    }

    /// Appends a raw frame with the given kind and payload.
    pub fn append_raw(&mut self, kind: FrameKind, payload: &[u8]) -> Result<(), JournalError> {
        let max = crate::frame::MAX_PAYLOAD_SIZE;
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= max)
            .ok_or(JournalError::PayloadTooLarge {
                size: payload.len() as u64,
                max,
            })?;
        let frame = RecordFrame::new(kind, len)?;

        let start = self.end;
        if let Err(e) = self.write_frame(start, frame, payload) {
            tracing::error!(offset = start, error = %e, "journal append failed; rolling back");
            self.rollback(start);
            return Err(e);
        }
        self.end = start + (crate::frame::FRAME_HEADER_SIZE as u64) + u64::from(len);
        Ok(())
    }

    fn write_frame(
        &mut self,
        start: u64,
        frame: RecordFrame,
        payload: &[u8],
    ) -> Result<(), JournalError> {
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&frame.to_bytes())?;
        self.file.write_all(payload)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn rollback(&mut self, start: u64) {
        if let Err(e) = self.file.set_len(start) {
            tracing::error!(offset = start, error = %e, "journal rollback failed");
        }
    }

    /// Flushes and closes the journal.
    pub fn finish(mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}
