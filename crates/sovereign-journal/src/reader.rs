//! Journal reader implementation.

use crate::errors::JournalError;
use crate::frame::{FrameKind, JournalHeader, RecordFrame, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::EntryJson;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Read mode for handling truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Strict mode: truncated frames are errors.
    Strict,
    /// Permissive mode: truncation is treated as end-of-file.
    Permissive,
}

/// Sequential reader over a ledger journal.
///
/// The ledger itself always reads in [`ReadMode::Strict`] so a damaged file
/// surfaces as an error instead of a silently shortened chain. Permissive
/// mode exists for salvage tooling.
///
/// # Example
///
/// ```rust,no_run
/// use sovereign_journal::{JournalReader, ReadMode};
///
/// let mut reader = JournalReader::open("ledger.spl", ReadMode::Strict)?;
/// while let Some(entry) = reader.read_entry()? {
///     println!("{}", entry["index"]);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct JournalReader {
    file: BufReader<File>,
    mode: ReadMode,
    position: u64,
    len: u64,
}

impl JournalReader {
    /// Opens a journal and validates its header.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if the file cannot be opened, the header is
    /// invalid, or an I/O error occurs.
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, JournalError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let mut file = BufReader::new(file);

        let mut header = [0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(JournalError::InvalidHeader(format!(
                    "header too short: {} bytes",
                    len
                )))
            }
            Err(e) => return Err(e.into()),
        }
        JournalHeader::from_bytes(&header)?;

        Ok(Self {
            file,
            mode,
            position: HEADER_SIZE as u64,
            len,
        })
    }

    /// Current byte offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads the next raw frame. `Ok(None)` at end-of-file.
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        if self.position >= self.len {
            return Ok(None);
        }

        let frame_start = self.position;
        let mut header = [0u8; FRAME_HEADER_SIZE];
        if !self.fill(&mut header, frame_start)? {
            return Ok(None);
        }
        let frame = RecordFrame::from_bytes(&header, frame_start)?;
        self.position += FRAME_HEADER_SIZE as u64;

        let mut payload = vec![0u8; frame.len as usize];
        if !self.fill(&mut payload, self.position)? {
            return Ok(None);
        }
        self.position += u64::from(frame.len);

        Ok(Some((frame.kind, payload)))
    }

    /// Reads the next ledger entry as JSON, skipping unknown frame kinds.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if a frame is malformed, the payload is not
    /// UTF-8 JSON, or (in strict mode) the file ends mid-frame.
    pub fn read_entry(&mut self) -> Result<Option<EntryJson>, JournalError> {
        loop {
            let payload_offset = self.position + FRAME_HEADER_SIZE as u64;
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::EntryJson, payload)) => {
                    let text = std::str::from_utf8(&payload).map_err(|_| {
                        JournalError::InvalidUtf8 {
                            offset: payload_offset,
                        }
                    })?;
                    let json = serde_json::from_str(text).map_err(|source| {
                        JournalError::InvalidJson {
                            offset: payload_offset,
                            source,
                        }
                    })?;
                    return Ok(Some(json));
                }
                Some((FrameKind::Unknown(kind), _)) => {
                    tracing::debug!(kind, "skipping unknown frame kind");
                    continue;
                }
            }
        }
    }

    /// Reads every remaining entry.
    pub fn read_all(&mut self) -> Result<Vec<EntryJson>, JournalError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.read_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Fills `buf` from the current file position.
    ///
    /// Returns `Ok(false)` on truncation in permissive mode.
    fn fill(&mut self, buf: &mut [u8], offset: u64) -> Result<bool, JournalError> {
        match self.file.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => match self.mode {
                ReadMode::Permissive => {
                    tracing::warn!(offset, "journal truncated; stopping early");
                    Ok(false)
                }
                ReadMode::Strict => Err(JournalError::TruncatedFrame { offset }),
            },
            Err(e) => Err(e.into()),
        }
    }
}
