//! Output formatting utilities.

use serde::Serialize;
use sovereign_store::LedgerEntry;

/// Formats any serializable value as pretty JSON.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Formats an entry as a simple table row.
pub fn format_table_row(entry: &LedgerEntry) -> String {
    let (trace_id, event_name, agent_id) = match &entry.signed_event {
        Some(signed) => (
            signed.event.trace_id.as_str(),
            signed.event.event_name.as_str(),
            signed.event.agent_id.as_str(),
        ),
        None => ("-", "genesis", "-"),
    };

    format!(
        "{:<6} {:<27} {:<24} {:<24} {:<18} {}",
        entry.index,
        entry.timestamp,
        truncate(trace_id, 24),
        event_name,
        truncate(agent_id, 18),
        truncate(&entry.event_hash, 16)
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!(
        "{:<6} {:<27} {:<24} {:<24} {:<18} {}",
        "INDEX", "TIMESTAMP", "TRACE", "EVENT", "AGENT", "HASH"
    );
    println!("{}", "-".repeat(120));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
