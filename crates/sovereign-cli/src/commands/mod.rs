pub mod append;
pub mod canonicalize;
pub mod export;
pub mod fingerprint;
pub mod get;
pub mod init;
pub mod list;
pub mod recent;
pub mod stats;
pub mod trace;
pub mod verify;

use sovereign_store::{HashChainLedger, JournalBackend};
use std::path::Path;

/// Opens an existing ledger for reading.
///
/// The journal is opened without a writer and a ledger with no genesis
/// entry is refused, so read commands never modify the file.
pub fn open_ledger(
    path: &Path,
) -> Result<HashChainLedger<JournalBackend>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("ledger not found: {}", path.display()).into());
    }
    tracing::debug!(path = %path.display(), "opening ledger read-only");
    let backend = JournalBackend::open_read_only(path)
        .map_err(|e| format!("Failed to open ledger {}: {}", path.display(), e))?;
    Ok(HashChainLedger::open_existing(backend)?)
}
