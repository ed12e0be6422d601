//! Derived, rebuildable aggregate counts over one chain's entries.
//!
//! The index is never authoritative: it can be recomputed from the chain at
//! any time (`rebuild`), and is maintained incrementally on the append path
//! (`apply`) to avoid an O(n) rebuild per write. The two must converge to
//! the same result for the same entry set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodian_contracts::entry::{Entry, GENESIS_HASH};

/// Aggregate counts for one ledger, keyed by the entry fields callers
/// filter on most.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerIndex {
    /// Total entries counted.
    pub total_entries: usize,

    /// The `entry_hash` of the last counted entry, or the genesis sentinel.
    pub last_hash: String,

    /// Counts keyed by `action_type`.
    pub by_action_type: BTreeMap<String, u64>,

    /// Counts keyed by `actor_id`.
    pub by_actor: BTreeMap<String, u64>,

    /// Counts keyed by `subject_id`; entries without one are not counted.
    pub by_subject: BTreeMap<String, u64>,
}

impl LedgerIndex {
    /// An index for an empty chain.
    pub fn new() -> Self {
        Self {
            last_hash: GENESIS_HASH.to_string(),
            ..Self::default()
        }
    }

    /// Recompute all counts from scratch.
    ///
    /// Used after load and after any bulk change to the chain.
    pub fn rebuild(entries: &[Entry]) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.apply(entry);
        }
        index
    }

    /// Incrementally count one newly appended entry.
    ///
    /// Must only be called with the entry that was just appended to the
    /// chain this index summarizes — `last_hash` tracks the append.
    pub fn apply(&mut self, entry: &Entry) {
        self.total_entries += 1;
        self.last_hash = entry.entry_hash.clone();

        *self
            .by_action_type
            .entry(entry.action_type.clone())
            .or_insert(0) += 1;
        *self.by_actor.entry(entry.actor_id.clone()).or_insert(0) += 1;

        if let Some(subject) = &entry.subject_id {
            if !subject.is_empty() {
                *self.by_subject.entry(subject.clone()).or_insert(0) += 1;
            }
        }
    }
}

/// The on-disk snapshot form of a `LedgerIndex`.
///
/// Safe to delete at any time — the store rewrites it from the chain.
#[derive(Debug, Serialize)]
pub struct IndexSnapshot<'a> {
    /// When the snapshot was written (UTC).
    pub last_updated: DateTime<Utc>,

    #[serde(flatten)]
    pub index: &'a LedgerIndex,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use custodian_contracts::entry::ActionReport;

    use crate::chain::seal_entry;

    use super::*;

    fn chain_of(reports: Vec<ActionReport>) -> Vec<Entry> {
        let mut entries = Vec::new();
        let mut previous = GENESIS_HASH.to_string();
        for report in reports {
            let entry = seal_entry(Utc::now(), report, previous);
            previous = entry.entry_hash.clone();
            entries.push(entry);
        }
        entries
    }

    fn report(action_type: &str, actor: &str, subject: Option<&str>) -> ActionReport {
        ActionReport {
            action_type: action_type.to_string(),
            action: "create".to_string(),
            target: "thing".to_string(),
            details: String::new(),
            actor_id: actor.to_string(),
            subject_id: subject.map(str::to_string),
            metadata: BTreeMap::new(),
        }
    }

    /// Rebuild-from-scratch and incremental apply converge to the same
    /// counts for the same entry sequence.
    #[test]
    fn rebuild_equals_incremental_apply() {
        let entries = chain_of(vec![
            report("module", "alice", Some("MOD-1")),
            report("module", "bob", None),
            report("node", "alice", Some("NOD-1")),
            report("system", "system", None),
            report("node", "alice", Some("NOD-1")),
        ]);

        let rebuilt = LedgerIndex::rebuild(&entries);

        let mut incremental = LedgerIndex::new();
        for entry in &entries {
            incremental.apply(entry);
        }

        assert_eq!(rebuilt.total_entries, incremental.total_entries);
        assert_eq!(rebuilt.last_hash, incremental.last_hash);
        assert_eq!(rebuilt.by_action_type, incremental.by_action_type);
        assert_eq!(rebuilt.by_actor, incremental.by_actor);
        assert_eq!(rebuilt.by_subject, incremental.by_subject);
    }

    #[test]
    fn counts_reflect_entries() {
        let entries = chain_of(vec![
            report("module", "alice", Some("MOD-1")),
            report("module", "bob", None),
            report("node", "alice", None),
        ]);

        let index = LedgerIndex::rebuild(&entries);

        assert_eq!(index.total_entries, 3);
        assert_eq!(index.by_action_type["module"], 2);
        assert_eq!(index.by_action_type["node"], 1);
        assert_eq!(index.by_actor["alice"], 2);
        assert_eq!(index.by_actor["bob"], 1);
        assert_eq!(index.by_subject["MOD-1"], 1);
        assert!(!index.by_subject.contains_key(""));
        assert_eq!(index.last_hash, entries[2].entry_hash);
    }

    #[test]
    fn empty_index_carries_genesis_hash() {
        let index = LedgerIndex::rebuild(&[]);

        assert_eq!(index.total_entries, 0);
        assert_eq!(index.last_hash, GENESIS_HASH);
        assert!(index.by_action_type.is_empty());
    }
}
