//! Entry filtering API for selective iteration.

use crate::entry::LedgerEntry;
use crate::error::StoreError;
use crate::traits::StoreReader;
use sovereign_core::{EventEnvelope, EventName};

/// Trait for filtering ledger entries during iteration.
pub trait EntryFilter {
    /// Returns true if the entry matches the filter criteria.
    fn matches(&self, entry: &LedgerEntry) -> bool;
}

impl<F: EntryFilter + ?Sized> EntryFilter for Box<F> {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        (**self).matches(entry)
    }
}

fn envelope(entry: &LedgerEntry) -> Option<&EventEnvelope> {
    entry.signed_event.as_ref().map(|s| &s.event)
}

/// Filter by trace id. Genesis never matches.
#[derive(Debug, Clone)]
pub struct TraceFilter {
    /// Trace id to match.
    pub trace_id: String,
}

impl EntryFilter for TraceFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        envelope(entry)
            .map(|e| e.trace_id.as_str() == self.trace_id)
            .unwrap_or(false)
    }
}

/// Filter by event name.
#[derive(Debug, Clone)]
pub struct EventNameFilter {
    /// Event name to match.
    pub event_name: EventName,
}

impl EntryFilter for EventNameFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        envelope(entry)
            .map(|e| e.event_name == self.event_name)
            .unwrap_or(false)
    }
}

/// Filter by emitting agent.
#[derive(Debug, Clone)]
pub struct AgentFilter {
    /// Agent id to match.
    pub agent_id: String,
}

impl EntryFilter for AgentFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        envelope(entry)
            .map(|e| e.agent_id.as_str() == self.agent_id)
            .unwrap_or(false)
    }
}

/// Filter by jurisdiction, ignoring case.
#[derive(Debug, Clone)]
pub struct JurisdictionFilter {
    /// Jurisdiction to match.
    pub jurisdiction: String,
}

impl EntryFilter for JurisdictionFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        envelope(entry)
            .map(|e| e.jurisdiction.as_str().eq_ignore_ascii_case(&self.jurisdiction))
            .unwrap_or(false)
    }
}

/// Filter by entry timestamp.
///
/// Bounds compare as strings, which orders correctly for the fixed-width
/// UTC timestamps the ledger writes.
#[derive(Debug, Clone, Default)]
pub struct TimeRangeFilter {
    /// Include entries at or after this timestamp.
    pub after: Option<String>,
    /// Include entries at or before this timestamp.
    pub before: Option<String>,
}

impl EntryFilter for TimeRangeFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        let at = entry.timestamp.as_str();
        if let Some(after) = &self.after {
            if at < after.as_str() {
                return false;
            }
        }
        if let Some(before) = &self.before {
            if at > before.as_str() {
                return false;
            }
        }
        true
    }
}

/// Composite filter: all filters must match (AND). Empty matches everything.
#[derive(Default)]
pub struct AndFilter {
    /// Filters to combine with AND logic.
    pub filters: Vec<Box<dyn EntryFilter + Send + Sync>>,
}

impl EntryFilter for AndFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        self.filters.iter().all(|f| f.matches(entry))
    }
}

/// Composite filter: any filter must match (OR). Empty matches nothing.
#[derive(Default)]
pub struct OrFilter {
    /// Filters to combine with OR logic.
    pub filters: Vec<Box<dyn EntryFilter + Send + Sync>>,
}

impl EntryFilter for OrFilter {
    fn matches(&self, entry: &LedgerEntry) -> bool {
        self.filters.iter().any(|f| f.matches(entry))
    }
}

/// Reader that filters entries from an underlying reader.
#[derive(Debug)]
pub struct FilteredReader<R: StoreReader, F: EntryFilter> {
    reader: R,
    filter: F,
}

impl<R: StoreReader, F: EntryFilter> FilteredReader<R, F> {
    /// Creates a new filtered reader.
    pub fn new(reader: R, filter: F) -> Self {
        Self { reader, filter }
    }
}

impl<R: StoreReader, F: EntryFilter> StoreReader for FilteredReader<R, F> {
    fn read_next(&mut self) -> Result<Option<LedgerEntry>, StoreError> {
        loop {
            match self.reader.read_next()? {
                None => return Ok(None),
                Some(entry) if self.filter.matches(&entry) => return Ok(Some(entry)),
                Some(_) => continue,
            }
        }
    }
}
