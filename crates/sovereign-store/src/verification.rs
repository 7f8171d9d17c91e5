//! Whole-chain verification.

use crate::entry::{event_hash, LedgerEntry, GENESIS_HASH};
use serde::Serialize;
use sovereign_canonical::{Canonicalizer, HexDigest};
use std::collections::BTreeSet;
use std::fmt;

/// One way the stored sequence departs from a valid hash chain.
///
/// `position` is where the entry sits in the stored sequence, which is also
/// the index it should carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainViolation {
    /// The chain is empty, or its first entry is not a well-formed genesis.
    GenesisMalformed {
        /// What is wrong with it.
        reason: String,
    },
    /// An entry carries an index other than its position.
    IndexMismatch {
        /// Position in the sequence.
        position: u64,
        /// Index stored in the entry.
        found: u64,
    },
    /// A non-genesis entry has no signed event.
    MissingEvent {
        /// Position in the sequence.
        position: u64,
    },
    /// The stored `event_hash` does not match the recomputed one.
    HashMismatch {
        /// Position in the sequence.
        position: u64,
        /// Hash recomputed from the stored signed event.
        expected: String,
        /// Hash stored in the entry.
        found: String,
    },
    /// `prev_hash` does not equal the previous entry's `event_hash`.
    LinkMismatch {
        /// Position in the sequence.
        position: u64,
        /// `event_hash` of the previous entry.
        expected: String,
        /// `prev_hash` stored in the entry.
        found: String,
    },
}

impl ChainViolation {
    /// Position of the offending entry. Genesis problems report 0.
    pub fn position(&self) -> u64 {
        match self {
            ChainViolation::GenesisMalformed { .. } => 0,
            ChainViolation::IndexMismatch { position, .. }
            | ChainViolation::MissingEvent { position }
            | ChainViolation::HashMismatch { position, .. }
            | ChainViolation::LinkMismatch { position, .. } => *position,
        }
    }
}

impl fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainViolation::GenesisMalformed { reason } => {
                write!(f, "genesis malformed: {}", reason)
            }
            ChainViolation::IndexMismatch { position, found } => {
                write!(f, "entry {}: stored index is {}", position, found)
            }
            ChainViolation::MissingEvent { position } => {
                write!(f, "entry {}: signed_event is missing", position)
            }
            ChainViolation::HashMismatch {
                position,
                expected,
                found,
            } => write!(
                f,
                "entry {}: event_hash {} does not match recomputed {}",
                position, found, expected
            ),
            ChainViolation::LinkMismatch {
                position,
                expected,
                found,
            } => write!(
                f,
                "entry {}: prev_hash {} does not match previous event_hash {}",
                position, found, expected
            ),
        }
    }
}

/// Result of verifying a whole chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Number of entries examined, genesis included.
    pub entries_checked: u64,
    /// Every violation found, in chain order.
    pub violations: Vec<ChainViolation>,
}

impl ChainReport {
    /// True when no violation was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Positions of all entries named by a violation.
    pub fn flagged_positions(&self) -> BTreeSet<u64> {
        self.violations.iter().map(ChainViolation::position).collect()
    }

    /// Positions whose content cannot be trusted.
    ///
    /// A broken link at `p` means either entry `p` or entry `p - 1` was
    /// altered: a rewritten entry whose hash was recomputed only shows up as
    /// a link mismatch on its successor. Both sides are suspect.
    pub fn suspect_positions(&self) -> BTreeSet<u64> {
        let mut suspects = BTreeSet::new();
        for violation in &self.violations {
            let position = violation.position();
            if let ChainViolation::LinkMismatch { .. } = violation {
                suspects.insert(position.saturating_sub(1));
            }
            suspects.insert(position);
        }
        suspects
    }
}

/// Verifies a stored sequence, collecting every violation instead of
/// stopping at the first.
pub fn verify_entries(canonicalizer: &Canonicalizer, entries: &[LedgerEntry]) -> ChainReport {
    let mut report = ChainReport {
        entries_checked: entries.len() as u64,
        violations: Vec::new(),
    };

    let Some(genesis) = entries.first() else {
        report.violations.push(ChainViolation::GenesisMalformed {
            reason: "chain is empty".to_string(),
        });
        return report;
    };
    if let Some(reason) = genesis_problem(genesis) {
        report
            .violations
            .push(ChainViolation::GenesisMalformed { reason });
    }

    for (position, pair) in entries.windows(2).enumerate() {
        let (prev, entry) = (&pair[0], &pair[1]);
        let position = position as u64 + 1;

        if entry.index != position {
            report.violations.push(ChainViolation::IndexMismatch {
                position,
                found: entry.index,
            });
        }

        match &entry.signed_event {
            None => report
                .violations
                .push(ChainViolation::MissingEvent { position }),
            Some(signed) => {
                let expected = match event_hash(canonicalizer, signed) {
                    Ok(digest) => digest.into_string(),
                    Err(e) => format!("<uncomputable: {}>", e),
                };
                if expected != entry.event_hash {
                    report.violations.push(ChainViolation::HashMismatch {
                        position,
                        expected,
                        found: entry.event_hash.clone(),
                    });
                }
            }
        }

        if entry.prev_hash != prev.event_hash {
            report.violations.push(ChainViolation::LinkMismatch {
                position,
                expected: prev.event_hash.clone(),
                found: entry.prev_hash.clone(),
            });
        }
    }

    report
}

fn genesis_problem(genesis: &LedgerEntry) -> Option<String> {
    if genesis.index != 0 {
        return Some(format!("index is {}", genesis.index));
    }
    if genesis.event_hash != GENESIS_HASH {
        return Some(format!("event_hash is {:?}", genesis.event_hash));
    }
    if genesis.prev_hash != HexDigest::zero().as_str() {
        return Some("prev_hash is not all zeros".to_string());
    }
    if genesis.signed_event.is_some() {
        return Some("genesis carries a signed event".to_string());
    }
    None
}
