//! Append-only journal format for Sovereign ledger entries.
//!
//! This crate provides:
//! - Framed, append-only storage of ledger entries as JSON
//! - A strict reader that refuses truncated or malformed frames
//! - A writer that never leaves a partial frame behind
//!
//! ## Layout
//!
//! A 16-byte header (`SPL1`, version, flags, reserved) is followed by
//! frames, each an 8-byte frame header and a JSON payload of up to 16 MiB.
//! Hash chaining lives one layer up, in `sovereign-store`; the journal only
//! guarantees that what was written is read back byte-for-byte, in order.
//!
//! ## Key Types
//!
//! - [`JournalWriter`] - Append entries to a journal file
//! - [`JournalReader`] - Read entries back in order

#![deny(missing_docs)]

/// Error types for journal operations.
pub mod errors;
/// Frame structure and serialization.
pub mod frame;
/// Journal reader implementation.
pub mod reader;
/// Journal writer implementation.
pub mod writer;

pub use errors::JournalError;
pub use frame::{FrameKind, JournalHeader, RecordFrame};
pub use reader::{JournalReader, ReadMode};
pub use writer::{JournalWriter, WriteOptions};

/// One ledger entry as stored in a frame payload.
///
/// The journal does not interpret entries; typed parsing happens in
/// `sovereign-store`.
pub type EntryJson = serde_json::Value;
