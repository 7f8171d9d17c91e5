//! Init command implementation.

use sovereign_core::ProvenanceConfig;
use sovereign_store::{HashChainLedger, JournalBackend, WriteOptions};
use std::path::PathBuf;

pub fn run(config: &ProvenanceConfig, ledger: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let backend = JournalBackend::open(
        &ledger,
        WriteOptions {
            sync: config.ledger.sync,
            create: true,
        },
    )?;
    let chain = HashChainLedger::open(backend)?;
    println!(
        "Initialized ledger {} (chain length {})",
        ledger.display(),
        chain.get_chain_length()
    );
    Ok(())
}
