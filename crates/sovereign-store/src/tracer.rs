//! Per-trace audit histories reconstructed from the ledger.

use crate::error::LedgerError;
use crate::ledger::HashChainLedger;
use crate::traits::LedgerBackend;
use crate::verification::verify_entries;
use serde::Serialize;
use sovereign_canonical::Canonicalizer;
use sovereign_core::{EventName, SignedEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// One event of a trace, with its ledger position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    /// Ledger index of the entry.
    pub index: u64,
    /// Entry timestamp.
    pub timestamp: String,
    /// The recorded event.
    pub signed_event: SignedEvent,
}

/// Every recorded event of one trace, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceHistory {
    /// The requested trace.
    pub trace_id: String,
    /// Whether the selected events are consistent with a valid chain.
    pub chain_valid: bool,
    /// Events sorted by entry timestamp.
    pub events: Vec<TraceEvent>,
}

/// Activity of one trace within a window of recent entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    /// The trace.
    pub trace_id: String,
    /// Latest entry timestamp of the trace in the window.
    pub latest_timestamp: String,
    /// Events of the trace in the window.
    pub event_count: u64,
    /// Name of the trace's latest event in the window.
    pub latest_event: EventName,
}

/// Answers "what happened for trace X" and "what ran recently" by scanning
/// the ledger.
///
/// Holds a shared handle on the ledger; it never writes.
pub struct LineageTracer<B: LedgerBackend> {
    ledger: Arc<HashChainLedger<B>>,
    canonicalizer: Canonicalizer,
}

impl<B: LedgerBackend> Clone for LineageTracer<B> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            canonicalizer: self.canonicalizer,
        }
    }
}

impl<B: LedgerBackend> LineageTracer<B> {
    /// Creates a tracer over `ledger`.
    pub fn new(ledger: Arc<HashChainLedger<B>>) -> Self {
        Self {
            ledger,
            canonicalizer: Canonicalizer::new(),
        }
    }

    /// All events of `trace_id`, sorted by entry timestamp.
    ///
    /// Events are selected by their envelope's `trace_id`. `chain_valid`
    /// holds when none of their entries is suspect under whole-chain
    /// verification, which includes the predecessor of every broken link.
    /// An unknown trace yields no events and `chain_valid = true`.
    pub fn get_trace_history(&self, trace_id: &str) -> Result<TraceHistory, LedgerError> {
        let entries = self.ledger.get_all_entries()?;
        let suspects = verify_entries(&self.canonicalizer, &entries).suspect_positions();

        let mut any_suspect = false;
        let mut events = Vec::new();
        for (position, entry) in entries.into_iter().enumerate() {
            if entry.trace_id() != Some(trace_id) {
                continue;
            }
            any_suspect |= suspects.contains(&(position as u64));
            if let Some(signed_event) = entry.signed_event {
                events.push(TraceEvent {
                    index: entry.index,
                    timestamp: entry.timestamp,
                    signed_event,
                });
            }
        }
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let chain_valid = !any_suspect;
        if !chain_valid {
            tracing::warn!(trace_id, "trace touches entries that fail verification");
        }

        Ok(TraceHistory {
            trace_id: trace_id.to_string(),
            chain_valid,
            events,
        })
    }

    /// Summaries of the traces seen in the last `limit` ledger entries,
    /// latest first, at most `limit` of them.
    ///
    /// The window counts entries, not traces. `limit <= 0` yields nothing.
    pub fn get_recent_traces(&self, limit: i64) -> Result<Vec<TraceSummary>, LedgerError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let entries = self.ledger.get_all_entries()?;
        let window = &entries[entries.len().saturating_sub(limit)..];

        struct Group {
            summary: TraceSummary,
            latest_index: u64,
        }

        let mut groups: Vec<Group> = Vec::new();
        let mut by_trace: HashMap<&str, usize> = HashMap::new();
        for entry in window {
            let Some(signed) = &entry.signed_event else {
                continue;
            };
            let trace_id = signed.event.trace_id.as_str();
            match by_trace.get(trace_id) {
                Some(&slot) => {
                    let group = &mut groups[slot];
                    group.summary.event_count += 1;
                    let newer = (entry.timestamp.as_str(), entry.index)
                        > (group.summary.latest_timestamp.as_str(), group.latest_index);
                    if newer {
                        group.summary.latest_timestamp = entry.timestamp.clone();
                        group.summary.latest_event = signed.event.event_name;
                        group.latest_index = entry.index;
                    }
                }
                None => {
                    by_trace.insert(trace_id, groups.len());
                    groups.push(Group {
                        summary: TraceSummary {
                            trace_id: trace_id.to_string(),
                            latest_timestamp: entry.timestamp.clone(),
                            event_count: 1,
                            latest_event: signed.event.event_name,
                        },
                        latest_index: entry.index,
                    });
                }
            }
        }

        groups.sort_by(|a, b| {
            (b.summary.latest_timestamp.as_str(), b.latest_index)
                .cmp(&(a.summary.latest_timestamp.as_str(), a.latest_index))
        });
        Ok(groups
            .into_iter()
            .take(limit)
            .map(|g| g.summary)
            .collect())
    }
}

impl<B: LedgerBackend> std::fmt::Debug for LineageTracer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageTracer")
            .field("ledger", &self.ledger)
            .finish()
    }
}
