//! Verify command implementation.

use crate::commands::open_ledger;
use serde_json::json;
use sovereign_core::{EventSigner, NonceManager, ProvenanceConfig};
use sovereign_store::{LedgerError, ProvenanceChain};
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(
    config: &ProvenanceConfig,
    ledger: PathBuf,
    json_output: bool,
    strict: bool,
    signatures: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let chain = Arc::new(open_ledger(&ledger)?);
    let report = chain.verify_chain_report()?;

    let bad_signatures = if signatures {
        let service = ProvenanceChain::new(
            EventSigner::new(config.key_ring()?),
            NonceManager::with_ttl(config.nonce.ttl()),
            Arc::clone(&chain),
        );
        Some(service.verify_signatures()?)
    } else {
        None
    };

    let signatures_ok = bad_signatures.as_ref().map_or(true, |bad| bad.is_empty());
    let valid = report.is_valid() && signatures_ok;

    if json_output {
        let mut out = json!({
            "valid": valid,
            "entries_checked": report.entries_checked,
            "violations": report.violations,
        });
        if let Some(bad) = &bad_signatures {
            out["bad_signatures"] = json!(bad);
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for violation in &report.violations {
            println!("VIOLATION  {}", violation);
        }
        if let Some(bad) = &bad_signatures {
            for index in bad {
                println!("BAD SIG    entry {}", index);
            }
        }
        println!(
            "{} entries checked: {}",
            report.entries_checked,
            if valid { "chain valid" } else { "chain INVALID" }
        );
    }

    if strict && !valid {
        let problems = report.violations.len() + bad_signatures.map_or(0, |bad| bad.len());
        return Err(LedgerError::Integrity(format!("{} problem(s) found", problems)).into());
    }
    Ok(())
}
