//! Append command implementation.

use crate::output;
use serde_json::Value;
use sovereign_canonical::{AgentId, Jurisdiction, TraceId};
use sovereign_core::{Details, EventName, ProvenanceConfig};
use sovereign_store::{EventDraft, ProvenanceChain};
use std::path::PathBuf;

/// Event fields taken from the command line.
pub struct Args {
    pub trace_id: String,
    pub agent_id: String,
    pub event_name: String,
    pub jurisdiction: String,
    pub request_hash: Option<String>,
    pub query: Option<String>,
    pub user: Option<String>,
    pub details: Option<String>,
}

pub fn run(
    config: &ProvenanceConfig,
    ledger: PathBuf,
    args: Args,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let details = match args.details {
        Some(raw) => match serde_json::from_str::<Value>(&raw)
            .map_err(|e| format!("Invalid details JSON: {}", e))?
        {
            Value::Object(map) => map.into_iter().collect::<Details>(),
            _ => return Err("details must be a JSON object".into()),
        },
        None => Details::new(),
    };

    let mut draft = EventDraft::new(
        TraceId::parse(args.trace_id)?,
        AgentId::parse(args.agent_id)?,
        args.event_name.parse::<EventName>()?,
    )
    .jurisdiction(Jurisdiction::parse(args.jurisdiction)?);
    draft.details = details;
    if let Some(hash) = args.request_hash {
        draft = draft.request_hash(hash);
    }
    match args.query {
        Some(query) => draft = draft.context(query, args.user),
        None => draft.user_id = args.user,
    }

    let mut config = config.clone();
    config.ledger.path = ledger;
    let chain = ProvenanceChain::from_config(&config)?;
    let receipt = chain.record(draft)?;

    if json {
        println!("{}", output::format_json(&receipt)?);
    } else {
        println!(
            "Appended entry {} (nonce {}, request_hash {})",
            receipt.index, receipt.nonce, receipt.request_hash
        );
    }
    Ok(())
}
