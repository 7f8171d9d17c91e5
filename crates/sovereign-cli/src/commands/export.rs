//! Export command implementation.

use crate::commands::open_ledger;
use crate::output;
use std::path::PathBuf;

/// Prints the ledger in its persisted JSON-array form.
pub fn run(ledger: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&ledger)?;
    let entries = chain.get_all_entries()?;
    println!("{}", output::format_json(&entries)?);
    Ok(())
}
