//! Recent command implementation.

use crate::commands::open_ledger;
use crate::output;
use sovereign_store::LineageTracer;
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(ledger: PathBuf, limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    let tracer = LineageTracer::new(Arc::new(open_ledger(&ledger)?));
    let traces = tracer.get_recent_traces(limit)?;
    println!("{}", output::format_json(&traces)?);
    Ok(())
}
