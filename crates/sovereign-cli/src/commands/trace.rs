//! Trace command implementation.

use crate::commands::open_ledger;
use crate::output;
use sovereign_store::LineageTracer;
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(ledger: PathBuf, trace_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let tracer = LineageTracer::new(Arc::new(open_ledger(&ledger)?));
    let history = tracer.get_trace_history(&trace_id)?;
    println!("{}", output::format_json(&history)?);
    Ok(())
}
