//! Chain validation and statistics report types.
//!
//! `ChainValidation` is what `validate_chain()` returns: a pass/fail flag
//! plus every individual violation found. `LedgerStats` is the aggregate
//! summary derived from the index and the sequence bounds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One integrity violation found while walking the chain.
///
/// A hash mismatch and a broken predecessor link are independent findings:
/// an entry can fail one check without failing the other, and both are
/// reported separately for the same index when both apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainViolation {
    /// The entry's stored `entry_hash` does not match the hash recomputed
    /// from its own fields and the expected predecessor hash.
    HashMismatch {
        index: usize,
        entry_id: String,
        expected_hash: String,
        actual_hash: String,
    },

    /// The entry's stored `previous_hash` does not match the `entry_hash`
    /// of the entry before it (or the genesis sentinel at index 0).
    ChainBreak {
        index: usize,
        entry_id: String,
        expected_previous: String,
        actual_previous: String,
    },
}

impl ChainViolation {
    /// The chain position this violation was found at.
    pub fn index(&self) -> usize {
        match self {
            ChainViolation::HashMismatch { index, .. } => *index,
            ChainViolation::ChainBreak { index, .. } => *index,
        }
    }
}

/// The result of a full-chain integrity check.
///
/// Violations are findings, never auto-repaired — a broken chain is
/// evidence, not something the ledger fixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainValidation {
    /// True when no violation was found. An empty chain is trivially valid.
    pub valid: bool,

    /// Number of entries examined.
    pub total_entries: usize,

    /// Every violation found, in chain order.
    pub violations: Vec<ChainViolation>,
}

impl ChainValidation {
    /// A validation result for an empty chain.
    pub fn empty() -> Self {
        Self {
            valid: true,
            total_entries: 0,
            violations: Vec::new(),
        }
    }
}

/// Aggregate statistics for one named ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Total entries currently in the chain.
    pub total_entries: usize,

    /// Timestamp of the first entry, if any.
    pub first_entry: Option<DateTime<Utc>>,

    /// Timestamp of the most recently appended entry, if any.
    pub last_entry: Option<DateTime<Utc>>,

    /// The `entry_hash` of the final entry, or the genesis sentinel when
    /// the chain is empty.
    pub last_hash: String,

    /// Entry counts keyed by `action_type`.
    pub by_action_type: BTreeMap<String, u64>,

    /// Entry counts keyed by `actor_id`.
    pub by_actor: BTreeMap<String, u64>,

    /// Entry counts keyed by `subject_id` (entries without one are not
    /// counted here).
    pub by_subject: BTreeMap<String, u64>,
}
