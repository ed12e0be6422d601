//! The file-backed Chain Store for one named ledger.
//!
//! `LedgerStore` exclusively owns a chain's in-memory sequence and its
//! on-disk append-only JSONL file. It provides load-on-start recovery
//! (with quarantine of corrupt files), append-with-chaining, filtered
//! queries, full-chain validation, and aggregate stats.
//!
//! # Durability ordering
//!
//! `record_action` writes the serialized entry to the backing file and
//! flushes it to disk *before* the entry becomes visible in the in-memory
//! sequence, `last_hash`, or the index. A failed write publishes nothing —
//! the chain is exactly as it was before the call.
//!
//! # Thread safety
//!
//! The chain state lives behind an `RwLock`: appends (and the governed
//! wipe) are mutually exclusive, so chaining is never ambiguous; readers
//! observe a consistent snapshot and may run concurrently with each other.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use custodian_contracts::entry::{ActionReport, Entry, GENESIS_HASH};
use custodian_contracts::error::{CustodianError, CustodianResult};
use custodian_contracts::report::{ChainValidation, LedgerStats};

use crate::chain::{seal_entry, validate_chain};
use crate::index::{IndexSnapshot, LedgerIndex};

/// Filter and pagination parameters for `get_entries`.
///
/// All filters are conjunctive: an entry must satisfy every predicate that
/// is set. `start_time`/`end_time` are inclusive bounds on the entry
/// timestamp.
#[derive(Debug, Clone)]
pub struct EntryQuery {
    /// Maximum entries to return.
    pub limit: usize,

    /// Entries to skip after filtering and sorting.
    pub offset: usize,

    /// Only entries with this `action_type`.
    pub action_type: Option<String>,

    /// Only entries with this `actor_id`.
    pub actor_id: Option<String>,

    /// Only entries at or after this time.
    pub start_time: Option<DateTime<Utc>>,

    /// Only entries at or before this time.
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for EntryQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            action_type: None,
            actor_id: None,
            start_time: None,
            end_time: None,
        }
    }
}

impl EntryQuery {
    fn matches(&self, entry: &Entry) -> bool {
        if let Some(action_type) = &self.action_type {
            if &entry.action_type != action_type {
                return false;
            }
        }
        if let Some(actor_id) = &self.actor_id {
            if &entry.actor_id != actor_id {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }
}

/// A consistent view of one chain taken under a single lock: the full
/// validation result, the stats, and a bounded tail of final entries.
///
/// Used where the three must agree with each other — deletion-audit
/// records and transfer packages.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    /// Full-chain validation at snapshot time.
    pub validation: ChainValidation,

    /// Aggregate stats at snapshot time.
    pub stats: LedgerStats,

    /// The final entries, in append order.
    pub tail: Vec<Entry>,
}

// ── Internal mutable state ────────────────────────────────────────────────────

/// The mutable interior of a `LedgerStore`.
struct ChainState {
    /// All entries in append order.
    entries: Vec<Entry>,

    /// The `entry_hash` of the last entry, or `GENESIS_HASH` when empty.
    last_hash: String,

    /// Derived counts, kept in lockstep with `entries`.
    index: LedgerIndex,
}

// ── Public store ──────────────────────────────────────────────────────────────

/// One named, append-only, hash-chained ledger with a JSONL backing file.
pub struct LedgerStore {
    name: String,
    data_dir: PathBuf,
    ledger_path: PathBuf,
    index_path: PathBuf,
    state: RwLock<ChainState>,
    /// Where the corrupt backing file was quarantined at load time, if the
    /// load had to recover from corruption.
    recovered_from: Option<PathBuf>,
}

impl LedgerStore {
    /// Open the named ledger rooted at `data_dir`, loading existing entries
    /// from its backing file when one exists.
    ///
    /// On a malformed or truncated line (e.g. from a crash mid-write), the
    /// whole backing file is renamed to a timestamped quarantine name and
    /// the chain restarts empty. Bad lines are never silently skipped —
    /// the corrupt file is preserved verbatim as evidence, and
    /// [`recovered_from_corruption`](Self::recovered_from_corruption)
    /// reports the quarantine location.
    pub fn open(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> CustodianResult<Self> {
        let name = name.into();
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let ledger_path = data_dir.join(format!("{name}_ledger.jsonl"));
        let index_path = data_dir.join(format!("{name}_index.json"));

        let (entries, recovered_from) = match Self::load_entries(&ledger_path) {
            Ok(entries) => (entries, None),
            Err(parse_error) => {
                let quarantine = data_dir.join(format!(
                    "{name}_ledger_corrupt_{}.jsonl",
                    Utc::now().timestamp()
                ));
                fs::rename(&ledger_path, &quarantine)?;
                let condition = CustodianError::CorruptionRecovered {
                    ledger: name.clone(),
                    quarantined_to: quarantine.clone(),
                };
                warn!(
                    condition = %condition,
                    error = %parse_error,
                    "restarting chain empty after quarantine"
                );
                (Vec::new(), Some(quarantine))
            }
        };

        let last_hash = entries
            .last()
            .map(|e| e.entry_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let index = LedgerIndex::rebuild(&entries);

        let store = Self {
            name,
            data_dir,
            ledger_path,
            index_path,
            state: RwLock::new(ChainState {
                entries,
                last_hash,
                index,
            }),
            recovered_from,
        };

        store.write_index_snapshot();

        let state = store.state.read().expect("ledger state lock poisoned");
        info!(
            ledger = %store.name,
            entries = state.entries.len(),
            last_hash = %state.last_hash,
            "ledger opened"
        );
        drop(state);

        Ok(store)
    }

    /// Read and parse every line of the backing file.
    ///
    /// Any unreadable or unparseable line fails the whole load so the
    /// caller can quarantine the file. A missing file is an empty chain.
    fn load_entries(ledger_path: &Path) -> Result<Vec<Entry>, String> {
        if !ledger_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(ledger_path)
            .map_err(|e| format!("cannot open backing file: {e}"))?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("read error at line {}: {e}", line_num + 1))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let entry: Entry = serde_json::from_str(trimmed)
                .map_err(|e| format!("malformed entry at line {}: {e}", line_num + 1))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// The chain's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory this ledger's files live under.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the append-only backing file.
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Path of the derived index snapshot file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Where the corrupt backing file was quarantined at open time, when
    /// the load recovered from corruption.
    pub fn recovered_from_corruption(&self) -> Option<&Path> {
        self.recovered_from.as_deref()
    }

    /// Number of entries currently in the chain.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .expect("ledger state lock poisoned")
            .entries
            .len()
    }

    /// True when the chain has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `entry_hash` of the final entry, or the genesis sentinel.
    pub fn last_hash(&self) -> String {
        self.state
            .read()
            .expect("ledger state lock poisoned")
            .last_hash
            .clone()
    }

    // ── Append path ───────────────────────────────────────────────────────────

    /// Record one reported action, chained to the current `last_hash`.
    ///
    /// The entry is serialized and flushed to the backing file first; only
    /// after the durable write succeeds is it published to the in-memory
    /// sequence, `last_hash`, and the index. On `WriteFailure` the chain is
    /// untouched. Appends on one chain are serialized by the state write
    /// lock, so chaining is never ambiguous.
    ///
    /// Returns the new entry's display id.
    pub fn record_action(&self, report: ActionReport) -> CustodianResult<String> {
        let mut state = self
            .state
            .write()
            .map_err(|e| CustodianError::WriteFailure {
                reason: format!("ledger state lock poisoned: {e}"),
            })?;

        let entry = seal_entry(Utc::now(), report, state.last_hash.clone());

        self.append_durably(&entry)?;

        // Durable on disk — now publish.
        state.last_hash = entry.entry_hash.clone();
        state.index.apply(&entry);
        state.entries.push(entry.clone());
        drop(state);

        self.write_index_snapshot();

        info!(
            ledger = %self.name,
            action = %format!("{}.{}", entry.action_type, entry.action),
            target = %entry.target,
            actor = %entry.actor_id,
            entry_id = %entry.entry_id,
            "action recorded"
        );

        Ok(entry.entry_id)
    }

    /// Append one serialized entry line to the backing file and flush it.
    ///
    /// Single attempt, fail fast: any error is reported as `WriteFailure`
    /// and the caller publishes nothing.
    fn append_durably(&self, entry: &Entry) -> CustodianResult<()> {
        let line = serde_json::to_string(entry).map_err(|e| CustodianError::WriteFailure {
            reason: format!("failed to serialize entry: {e}"),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|e| CustodianError::WriteFailure {
                reason: format!(
                    "cannot open backing file {}: {e}",
                    self.ledger_path.display()
                ),
            })?;

        writeln!(file, "{line}").map_err(|e| CustodianError::WriteFailure {
            reason: format!("failed to append entry: {e}"),
        })?;

        file.sync_data().map_err(|e| CustodianError::WriteFailure {
            reason: format!("failed to flush entry to disk: {e}"),
        })
    }

    /// Write the index snapshot file.
    ///
    /// Best-effort: the snapshot is fully derivable from the chain, so a
    /// failed write is a warning, never a failed append.
    fn write_index_snapshot(&self) {
        let state = self.state.read().expect("ledger state lock poisoned");
        let snapshot = IndexSnapshot {
            last_updated: Utc::now(),
            index: &state.index,
        };

        let result = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.index_path, json).map_err(|e| e.to_string()));

        if let Err(e) = result {
            warn!(
                ledger = %self.name,
                path = %self.index_path.display(),
                error = %e,
                "failed to write index snapshot"
            );
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Return entries matching `query`, newest first.
    ///
    /// Display order is caller-timestamp order (ties keep append order);
    /// chain integrity is keyed to append order regardless, so an
    /// out-of-order caller timestamp affects display only. Filters are
    /// conjunctive; an empty result is valid.
    pub fn get_entries(&self, query: &EntryQuery) -> Vec<Entry> {
        let state = self.state.read().expect("ledger state lock poisoned");

        let mut matched: Vec<Entry> = state
            .entries
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        drop(state);

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        debug!(
            ledger = %self.name,
            matched = matched.len(),
            offset = query.offset,
            limit = query.limit,
            "entries queried"
        );

        matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect()
    }

    /// Recompute every hash in append order and report integrity findings.
    ///
    /// Findings are never auto-repaired: a broken chain is evidence.
    pub fn validate_chain(&self) -> ChainValidation {
        let state = self.state.read().expect("ledger state lock poisoned");
        validate_chain(&state.entries)
    }

    /// Aggregate statistics from the index plus the sequence bounds.
    pub fn get_stats(&self) -> LedgerStats {
        let state = self.state.read().expect("ledger state lock poisoned");
        Self::stats_locked(&state)
    }

    fn stats_locked(state: &ChainState) -> LedgerStats {
        LedgerStats {
            total_entries: state.entries.len(),
            first_entry: state.entries.first().map(|e| e.timestamp),
            last_entry: state.entries.last().map(|e| e.timestamp),
            last_hash: state.last_hash.clone(),
            by_action_type: state.index.by_action_type.clone(),
            by_actor: state.index.by_actor.clone(),
            by_subject: state.index.by_subject.clone(),
        }
    }

    /// Validation, stats, and the final `tail_len` entries, all taken from
    /// one locked view so they agree with each other.
    pub fn snapshot(&self, tail_len: usize) -> ChainSnapshot {
        let state = self.state.read().expect("ledger state lock poisoned");
        let skip = state.entries.len().saturating_sub(tail_len);

        ChainSnapshot {
            validation: validate_chain(&state.entries),
            stats: Self::stats_locked(&state),
            tail: state.entries[skip..].to_vec(),
        }
    }

    /// The final `count` entries in append order.
    ///
    /// Used for bounded tails in deletion-audit records and transfer
    /// packages.
    pub fn tail(&self, count: usize) -> Vec<Entry> {
        let state = self.state.read().expect("ledger state lock poisoned");
        let skip = state.entries.len().saturating_sub(count);
        state.entries[skip..].to_vec()
    }

    // ── Governed destruction ──────────────────────────────────────────────────

    /// Destroy the backing file and index snapshot and reset the chain to
    /// empty with `last_hash` at the genesis sentinel.
    ///
    /// This is the irreversible final step of the governed deletion
    /// workflow in custodian-governance; it must only run after the
    /// deletion-audit record is durably written.
    pub fn wipe(&self) -> CustodianResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| CustodianError::WriteFailure {
                reason: format!("ledger state lock poisoned: {e}"),
            })?;

        if self.ledger_path.exists() {
            fs::remove_file(&self.ledger_path)?;
        }
        if self.index_path.exists() {
            fs::remove_file(&self.index_path)?;
        }

        state.entries.clear();
        state.last_hash = GENESIS_HASH.to_string();
        state.index = LedgerIndex::new();

        info!(ledger = %self.name, "ledger files removed and chain reset");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn report(action_type: &str, action: &str, actor: &str) -> ActionReport {
        ActionReport {
            action_type: action_type.to_string(),
            action: action.to_string(),
            target: "target".to_string(),
            details: "details".to_string(),
            actor_id: actor.to_string(),
            subject_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Three appends: genesis linkage, last_hash tracking, valid chain,
    /// stats count — the canonical smoke scenario.
    #[test]
    fn three_appends_chain_correctly() {
        let tmp = TempDir::new().unwrap();
        let store = LedgerStore::open("ops", tmp.path()).unwrap();

        store.record_action(report("system", "start", "admin")).unwrap();
        store.record_action(report("module", "scan", "admin")).unwrap();
        store.record_action(report("node", "register", "admin")).unwrap();

        let entries = store.tail(3);
        assert_eq!(entries[0].previous_hash, GENESIS_HASH);
        assert_eq!(entries[1].previous_hash, entries[0].entry_hash);
        assert_eq!(store.last_hash(), entries[2].entry_hash);

        assert!(store.validate_chain().valid);
        assert_eq!(store.get_stats().total_entries, 3);
    }

    /// Entries persist across a close/reopen cycle, and the reloaded chain
    /// still validates.
    #[test]
    fn reopen_restores_chain() {
        let tmp = TempDir::new().unwrap();

        let first_last_hash = {
            let store = LedgerStore::open("ops", tmp.path()).unwrap();
            store.record_action(report("system", "start", "admin")).unwrap();
            store.record_action(report("system", "stop", "admin")).unwrap();
            store.last_hash()
        };

        let reopened = LedgerStore::open("ops", tmp.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.last_hash(), first_last_hash);
        assert!(reopened.validate_chain().valid);
        assert!(reopened.recovered_from_corruption().is_none());
    }

    /// A truncated/garbage line quarantines the whole file under a
    /// timestamped name and restarts the chain empty. The corrupt file
    /// survives as evidence.
    #[test]
    fn corrupt_backing_file_is_quarantined() {
        let tmp = TempDir::new().unwrap();

        {
            let store = LedgerStore::open("ops", tmp.path()).unwrap();
            store.record_action(report("system", "start", "admin")).unwrap();
        }

        // Simulate a crash mid-append: a half-written trailing line.
        let path = tmp.path().join("ops_ledger.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{{\"entry_id\": \"led_trunc").unwrap();
        drop(file);

        let store = LedgerStore::open("ops", tmp.path()).unwrap();

        assert_eq!(store.len(), 0, "chain restarts empty after quarantine");
        assert_eq!(store.last_hash(), GENESIS_HASH);

        let quarantined = store
            .recovered_from_corruption()
            .expect("corruption must be reported")
            .to_path_buf();
        assert!(quarantined.exists(), "quarantined file must be preserved");
        assert!(!path.exists(), "original backing file was renamed away");

        // The chain is usable again immediately.
        store.record_action(report("system", "restart", "admin")).unwrap();
        assert!(store.validate_chain().valid);
    }

    /// Filters are conjunctive and results are newest-first.
    #[test]
    fn get_entries_filters_and_paginates() {
        let tmp = TempDir::new().unwrap();
        let store = LedgerStore::open("ops", tmp.path()).unwrap();

        store.record_action(report("system", "start", "admin")).unwrap();
        store.record_action(report("module", "deploy", "alice")).unwrap();
        store.record_action(report("system", "config", "alice")).unwrap();

        // action_type alone.
        let systems = store.get_entries(&EntryQuery {
            action_type: Some("system".to_string()),
            ..EntryQuery::default()
        });
        assert_eq!(systems.len(), 2);

        // action_type AND actor.
        let both = store.get_entries(&EntryQuery {
            action_type: Some("system".to_string()),
            actor_id: Some("alice".to_string()),
            ..EntryQuery::default()
        });
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].action, "config");

        // Newest first.
        let all = store.get_entries(&EntryQuery::default());
        assert_eq!(all.len(), 3);
        assert!(all[0].timestamp >= all[2].timestamp);

        // Pagination.
        let page = store.get_entries(&EntryQuery {
            limit: 1,
            offset: 1,
            ..EntryQuery::default()
        });
        assert_eq!(page.len(), 1);

        // No match is an empty result, not an error.
        let none = store.get_entries(&EntryQuery {
            actor_id: Some("nobody".to_string()),
            ..EntryQuery::default()
        });
        assert!(none.is_empty());
    }

    /// Time-range filters compose with the other predicates.
    #[test]
    fn get_entries_time_range() {
        let tmp = TempDir::new().unwrap();
        let store = LedgerStore::open("ops", tmp.path()).unwrap();

        store.record_action(report("system", "start", "admin")).unwrap();
        let cutoff = Utc::now();
        store.record_action(report("system", "stop", "admin")).unwrap();

        let after = store.get_entries(&EntryQuery {
            action_type: Some("system".to_string()),
            start_time: Some(cutoff),
            ..EntryQuery::default()
        });
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].action, "stop");

        let before = store.get_entries(&EntryQuery {
            end_time: Some(cutoff),
            ..EntryQuery::default()
        });
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].action, "start");
    }

    /// Metadata survives the disk round trip and the reloaded entries
    /// still hash correctly.
    #[test]
    fn metadata_preserved_across_reload() {
        let tmp = TempDir::new().unwrap();

        {
            let store = LedgerStore::open("ops", tmp.path()).unwrap();
            let mut r = report("system", "start", "admin");
            r.metadata.insert("version".to_string(), json!("2.0"));
            r.metadata
                .insert("flags".to_string(), json!({"fast": true, "dry_run": false}));
            r.subject_id = Some("SYS-001".to_string());
            store.record_action(r).unwrap();
        }

        let store = LedgerStore::open("ops", tmp.path()).unwrap();
        let entries = store.tail(1);
        assert_eq!(entries[0].metadata["version"], json!("2.0"));
        assert_eq!(entries[0].subject_id.as_deref(), Some("SYS-001"));
        assert!(store.validate_chain().valid);
    }

    /// Stats combine index counts with sequence bounds.
    #[test]
    fn stats_reflect_chain() {
        let tmp = TempDir::new().unwrap();
        let store = LedgerStore::open("ops", tmp.path()).unwrap();

        let empty = store.get_stats();
        assert_eq!(empty.total_entries, 0);
        assert_eq!(empty.last_hash, GENESIS_HASH);
        assert!(empty.first_entry.is_none());

        store.record_action(report("module", "create", "alice")).unwrap();
        store.record_action(report("module", "update", "bob")).unwrap();

        let stats = store.get_stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.by_action_type["module"], 2);
        assert_eq!(stats.by_actor["alice"], 1);
        assert_eq!(stats.last_hash, store.last_hash());
        assert!(stats.first_entry.unwrap() <= stats.last_entry.unwrap());
    }

    /// The index snapshot file is written and is safe to delete.
    #[test]
    fn index_snapshot_written_and_disposable() {
        let tmp = TempDir::new().unwrap();
        let store = LedgerStore::open("ops", tmp.path()).unwrap();
        store.record_action(report("system", "start", "admin")).unwrap();

        let index_path = tmp.path().join("ops_index.json");
        assert!(index_path.exists());

        let snapshot: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&index_path).unwrap()).unwrap();
        assert_eq!(snapshot["total_entries"], json!(1));

        // Deleting the snapshot loses nothing: reopen rebuilds it.
        fs::remove_file(&index_path).unwrap();
        let reopened = LedgerStore::open("ops", tmp.path()).unwrap();
        assert!(index_path.exists());
        assert_eq!(reopened.get_stats().by_action_type["system"], 1);
    }

    /// wipe() removes the files and resets the chain to genesis.
    #[test]
    fn wipe_resets_chain() {
        let tmp = TempDir::new().unwrap();
        let store = LedgerStore::open("ops", tmp.path()).unwrap();
        store.record_action(report("system", "start", "admin")).unwrap();

        store.wipe().unwrap();

        assert!(store.is_empty());
        assert_eq!(store.last_hash(), GENESIS_HASH);
        assert!(!store.ledger_path().exists());
        assert!(!store.index_path().exists());

        // Appends after a wipe start a fresh chain from genesis.
        store.record_action(report("system", "start", "admin")).unwrap();
        assert_eq!(store.tail(1)[0].previous_hash, GENESIS_HASH);
    }
}
