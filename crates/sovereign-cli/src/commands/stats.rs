//! Stats command implementation.

use crate::commands::open_ledger;
use crate::output;
use std::path::PathBuf;

pub fn run(ledger: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&ledger)?;
    println!("{}", output::format_json(&chain.stats())?);
    Ok(())
}
