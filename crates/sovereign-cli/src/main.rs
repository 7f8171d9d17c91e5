//! Sovereign CLI - command-line interface for the provenance ledger.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    append, canonicalize, export, fingerprint, get, init, list, recent, stats, trace, verify,
};
use sovereign_core::ProvenanceConfig;

#[derive(Parser)]
#[command(name = "sovereign")]
#[command(about = "Sovereign provenance chain ledger operations CLI")]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a ledger containing only the genesis entry
    Init {
        /// Path to ledger file
        ledger: PathBuf,
    },
    /// Sign and append one event
    Append {
        /// Path to ledger file
        ledger: PathBuf,
        /// Trace the event belongs to
        #[arg(long)]
        trace_id: String,
        /// Emitting component
        #[arg(long)]
        agent_id: String,
        /// Event type (e.g. query_received)
        #[arg(long)]
        event_name: String,
        /// Jurisdiction context
        #[arg(long, default_value = "global")]
        jurisdiction: String,
        /// Request hash (derived from --query when omitted)
        #[arg(long)]
        request_hash: Option<String>,
        /// Request text to fingerprint into the request hash
        #[arg(long)]
        query: Option<String>,
        /// User to fingerprint into the request hash
        #[arg(long)]
        user: Option<String>,
        /// Event details as a JSON object
        #[arg(long)]
        details: Option<String>,
        /// Output the receipt as JSON
        #[arg(long)]
        json: bool,
    },
    /// List ledger entries
    List {
        /// Path to ledger file
        ledger: PathBuf,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
        /// Only entries of this trace
        #[arg(long)]
        trace: Option<String>,
        /// Only entries with this event name
        #[arg(long)]
        event_name: Option<String>,
        /// Only entries from this agent
        #[arg(long)]
        agent: Option<String>,
        /// Only entries in this jurisdiction
        #[arg(long)]
        jurisdiction: Option<String>,
    },
    /// Show one entry by index
    Get {
        /// Path to ledger file
        ledger: PathBuf,
        /// Entry index
        index: u64,
    },
    /// Verify hashes and links of the whole chain
    Verify {
        /// Path to ledger file
        ledger: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Exit with error code if the chain is invalid
        #[arg(long)]
        strict: bool,
        /// Also check every signature against the configured keys
        #[arg(long)]
        signatures: bool,
    },
    /// Show the ordered history of one trace
    Trace {
        /// Path to ledger file
        ledger: PathBuf,
        /// Trace id
        trace_id: String,
    },
    /// Summarize traces in the most recent entries
    Recent {
        /// Path to ledger file
        ledger: PathBuf,
        /// Number of recent entries to examine
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
    },
    /// Show chain length and event count
    Stats {
        /// Path to ledger file
        ledger: PathBuf,
    },
    /// Print the whole ledger as a JSON array
    Export {
        /// Path to ledger file
        ledger: PathBuf,
    },
    /// Compute a request-context fingerprint
    Fingerprint {
        /// Request text
        #[arg(long)]
        query: String,
        /// User id
        #[arg(long)]
        user: Option<String>,
        /// Jurisdiction
        #[arg(long, default_value = "global")]
        jurisdiction: String,
        /// ISO-8601 timestamp (default: now)
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProvenanceConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { ledger } => init::run(&config, ledger),
        Commands::Append {
            ledger,
            trace_id,
            agent_id,
            event_name,
            jurisdiction,
            request_hash,
            query,
            user,
            details,
            json,
        } => append::run(
            &config,
            ledger,
            append::Args {
                trace_id,
                agent_id,
                event_name,
                jurisdiction,
                request_hash,
                query,
                user,
                details,
            },
            json,
        ),
        Commands::List {
            ledger,
            json,
            trace,
            event_name,
            agent,
            jurisdiction,
        } => list::run(
            ledger,
            json,
            list::Selection {
                trace,
                event_name,
                agent,
                jurisdiction,
            },
        ),
        Commands::Get { ledger, index } => get::run(ledger, index),
        Commands::Verify {
            ledger,
            json,
            strict,
            signatures,
        } => verify::run(&config, ledger, json, strict, signatures),
        Commands::Trace { ledger, trace_id } => trace::run(ledger, trace_id),
        Commands::Recent { ledger, limit } => recent::run(ledger, limit),
        Commands::Stats { ledger } => stats::run(ledger),
        Commands::Export { ledger } => export::run(ledger),
        Commands::Fingerprint {
            query,
            user,
            jurisdiction,
            timestamp,
        } => fingerprint::run(query, user, jurisdiction, timestamp),
        Commands::Canonicalize { input } => canonicalize::run(input),
    }
}
