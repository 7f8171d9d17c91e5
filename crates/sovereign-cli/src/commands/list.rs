//! List command implementation.

use crate::commands::open_ledger;
use crate::output;
use sovereign_core::EventName;
use sovereign_store::{
    AgentFilter, AndFilter, EntryFilter, EventNameFilter, JurisdictionFilter, TraceFilter,
};
use std::path::PathBuf;

/// Optional narrowing of the listed entries. All given criteria must match.
pub struct Selection {
    pub trace: Option<String>,
    pub event_name: Option<String>,
    pub agent: Option<String>,
    pub jurisdiction: Option<String>,
}

impl Selection {
    fn into_filter(self) -> Result<AndFilter, Box<dyn std::error::Error>> {
        let mut filters: Vec<Box<dyn EntryFilter + Send + Sync>> = Vec::new();
        if let Some(trace_id) = self.trace {
            filters.push(Box::new(TraceFilter { trace_id }));
        }
        if let Some(name) = self.event_name {
            filters.push(Box::new(EventNameFilter {
                event_name: name.parse::<EventName>()?,
            }));
        }
        if let Some(agent_id) = self.agent {
            filters.push(Box::new(AgentFilter { agent_id }));
        }
        if let Some(jurisdiction) = self.jurisdiction {
            filters.push(Box::new(JurisdictionFilter { jurisdiction }));
        }
        Ok(AndFilter { filters })
    }
}

pub fn run(
    ledger: PathBuf,
    json: bool,
    selection: Selection,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = selection.into_filter()?;
    let chain = open_ledger(&ledger)?;

    if !json {
        output::print_table_header();
    }
    for entry in chain.query(filter)? {
        if json {
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!("{}", output::format_table_row(&entry));
        }
    }
    Ok(())
}
