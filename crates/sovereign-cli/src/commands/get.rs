//! Get command implementation.

use crate::commands::open_ledger;
use crate::output;
use std::path::PathBuf;

pub fn run(ledger: PathBuf, index: u64) -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&ledger)?;
    match chain.get_entry(index)? {
        Some(entry) => {
            println!("{}", output::format_json(&entry)?);
            Ok(())
        }
        None => Err(format!(
            "entry {} not found (chain length {})",
            index,
            chain.get_chain_length()
        )
        .into()),
    }
}
