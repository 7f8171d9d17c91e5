use thiserror::Error;

/// Errors that can occur during journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid file header (magic, version, flags or reserved bytes).
    #[error("invalid journal header: {0}")]
    InvalidHeader(String),
    /// Invalid frame structure.
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Byte offset where the frame starts.
        offset: u64,
        /// Reason for invalidity.
        reason: String,
    },
    /// Payload exceeds maximum size limit.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: u64,
        /// Maximum allowed size.
        max: u32,
    },
    /// Entry payload is not UTF-8.
    #[error("invalid UTF-8 in entry payload at offset {offset}")]
    InvalidUtf8 {
        /// Byte offset of the payload.
        offset: u64,
    },
    /// Entry payload is not valid JSON.
    #[error("invalid JSON in entry payload at offset {offset}: {source}")]
    InvalidJson {
        /// Byte offset of the payload.
        offset: u64,
        /// Parser error.
        source: serde_json::Error,
    },
    /// Entry could not be serialized.
    #[error("failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Existing file is shorter than a header and cannot be a journal.
    #[error("file is not empty but too short to be a journal")]
    FileNotEmpty,
    /// Truncated frame detected in strict mode.
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Byte offset where truncation occurred.
        offset: u64,
    },
}

impl JournalError {
    /// True for I/O failures that are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            JournalError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
