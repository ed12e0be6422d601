//! Hash-chain primitives: entry hashing, sealing, and chain validation.
//!
//! Every field that contributes to an entry's hash is listed explicitly so
//! nothing is accidentally omitted.
//!
//! Hash input layout (one colon-joined UTF-8 string, in order):
//!   1. timestamp as RFC 3339
//!   2. action_type
//!   3. action
//!   4. target
//!   5. details
//!   6. actor_id
//!   7. subject_id (empty string when absent)
//!   8. previous_hash (64 ASCII hex chars, or the genesis sentinel "0")
//!   9. canonical JSON of metadata (keys sorted — `BTreeMap` plus
//!      serde_json's ordered maps guarantee this)

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use custodian_contracts::entry::{ActionReport, Entry, GENESIS_HASH};
use custodian_contracts::report::{ChainValidation, ChainViolation};

/// Compute the SHA-256 hash for one reported action.
///
/// The hash commits to every business field, the entry's wall-clock
/// timestamp, and its link to the predecessor (`previous_hash`). Returns a
/// lowercase 64-character hex string.
///
/// # Panics
///
/// Panics if `metadata` cannot be serialized to JSON — which cannot happen
/// for a map of well-formed `serde_json::Value`s.
pub fn hash_report(
    timestamp: &DateTime<Utc>,
    report: &ActionReport,
    previous_hash: &str,
) -> String {
    // BTreeMap iterates in key order and serde_json keeps nested object
    // keys sorted, so this serialization is canonical across calls.
    let metadata_json = serde_json::to_string(&report.metadata)
        .expect("metadata map must always be serializable to JSON");

    let hash_input = format!(
        "{}:{}:{}:{}:{}:{}:{}:{}:{}",
        timestamp.to_rfc3339(),
        report.action_type,
        report.action,
        report.target,
        report.details,
        report.actor_id,
        report.subject_id.as_deref().unwrap_or(""),
        previous_hash,
        metadata_json,
    );

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive the human-facing display id for an entry.
///
/// `led_<unix millis>_<first 8 hash chars>` — used for log correlation and
/// lookup, never for integrity.
pub fn entry_display_id(timestamp: &DateTime<Utc>, entry_hash: &str) -> String {
    format!("led_{}_{}", timestamp.timestamp_millis(), &entry_hash[..8])
}

/// Seal a reported action into a chained `Entry`.
///
/// Computes the entry's hash against `previous_hash` and stamps the display
/// id. Pure computation — the caller is responsible for persisting the
/// result before publishing it.
pub fn seal_entry(
    timestamp: DateTime<Utc>,
    report: ActionReport,
    previous_hash: String,
) -> Entry {
    let entry_hash = hash_report(&timestamp, &report, &previous_hash);
    let entry_id = entry_display_id(&timestamp, &entry_hash);

    Entry {
        entry_id,
        timestamp,
        action_type: report.action_type,
        action: report.action,
        target: report.target,
        details: report.details,
        actor_id: report.actor_id,
        subject_id: report.subject_id,
        metadata: report.metadata,
        previous_hash,
        entry_hash,
    }
}

/// Validate the integrity of a hash chain.
///
/// Walks `entries` in append order and applies two independent checks per
/// entry:
///
/// 1. **Hash correctness** — the stored `entry_hash` must equal the hash
///    recomputed from the entry's own fields and the *expected* predecessor
///    hash (the running value, not the stored `previous_hash`).
/// 2. **Prev-hash linkage** — the stored `previous_hash` must equal the
///    preceding entry's `entry_hash` (or `GENESIS_HASH` at index 0).
///
/// An entry can fail one check without failing the other; both findings are
/// reported, each tagged with the offending index and entry id. An empty
/// chain is defined as valid. Violations are findings — never repaired here.
pub fn validate_chain(entries: &[Entry]) -> ChainValidation {
    let mut violations = Vec::new();
    let mut expected_previous = GENESIS_HASH.to_string();

    for (index, entry) in entries.iter().enumerate() {
        let recomputed = hash_report(&entry.timestamp, &entry.report(), &expected_previous);

        if recomputed != entry.entry_hash {
            violations.push(ChainViolation::HashMismatch {
                index,
                entry_id: entry.entry_id.clone(),
                expected_hash: recomputed,
                actual_hash: entry.entry_hash.clone(),
            });
        }

        if entry.previous_hash != expected_previous {
            violations.push(ChainViolation::ChainBreak {
                index,
                entry_id: entry.entry_id.clone(),
                expected_previous: expected_previous.clone(),
                actual_previous: entry.previous_hash.clone(),
            });
        }

        // Advance to this entry's stored hash: a single tampered entry must
        // produce exactly one mismatch, not cascade over the whole suffix.
        expected_previous = entry.entry_hash.clone();
    }

    ChainValidation {
        valid: violations.is_empty(),
        total_entries: entries.len(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    fn make_report(details: &str) -> ActionReport {
        ActionReport {
            action_type: "system".to_string(),
            action: "start".to_string(),
            target: "custodian".to_string(),
            details: details.to_string(),
            actor_id: "admin".to_string(),
            subject_id: None,
            metadata: BTreeMap::new(),
        }
    }

    fn make_chain(n: usize) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(n);
        let mut previous = GENESIS_HASH.to_string();
        for i in 0..n {
            let entry = seal_entry(Utc::now(), make_report(&format!("step {i}")), previous);
            previous = entry.entry_hash.clone();
            entries.push(entry);
        }
        entries
    }

    /// The same logical report always hashes identically.
    #[test]
    fn hash_is_deterministic() {
        let ts = Utc::now();
        let report = make_report("deterministic");

        let a = hash_report(&ts, &report, GENESIS_HASH);
        let b = hash_report(&ts, &report, GENESIS_HASH);

        assert_eq!(a, b);
        assert_eq!(a.len(), 64, "SHA-256 hex digest is 64 chars");
    }

    /// Metadata hashes the same regardless of the order keys were inserted.
    #[test]
    fn hash_independent_of_metadata_insertion_order() {
        let ts = Utc::now();

        let mut forward = make_report("meta");
        forward.metadata.insert("alpha".to_string(), json!(1));
        forward.metadata.insert("beta".to_string(), json!({"z": 1, "a": 2}));

        let mut reverse = make_report("meta");
        reverse.metadata.insert("beta".to_string(), json!({"a": 2, "z": 1}));
        reverse.metadata.insert("alpha".to_string(), json!(1));

        assert_eq!(
            hash_report(&ts, &forward, GENESIS_HASH),
            hash_report(&ts, &reverse, GENESIS_HASH),
        );
    }

    /// Changing any single field changes the hash.
    #[test]
    fn hash_commits_to_every_field() {
        let ts = Utc::now();
        let base = make_report("base");
        let base_hash = hash_report(&ts, &base, GENESIS_HASH);

        let mut changed = base.clone();
        changed.details = "changed".to_string();
        assert_ne!(hash_report(&ts, &changed, GENESIS_HASH), base_hash);

        let mut changed = base.clone();
        changed.subject_id = Some("MOD-00001".to_string());
        assert_ne!(hash_report(&ts, &changed, GENESIS_HASH), base_hash);

        // A different predecessor also changes the hash.
        assert_ne!(hash_report(&ts, &base, "ff"), base_hash);
    }

    /// Display id embeds the creation millis and the hash prefix.
    #[test]
    fn display_id_format() {
        let entry = seal_entry(Utc::now(), make_report("id"), GENESIS_HASH.to_string());

        assert!(entry.entry_id.starts_with("led_"));
        assert!(entry.entry_id.ends_with(&entry.entry_hash[..8]));
    }

    /// Sequential seals produce a valid chain; the empty chain is valid.
    #[test]
    fn sealed_chain_validates() {
        assert!(validate_chain(&[]).valid);

        let entries = make_chain(5);
        let validation = validate_chain(&entries);

        assert!(validation.valid);
        assert_eq!(validation.total_entries, 5);
        assert!(validation.violations.is_empty());
        assert_eq!(entries[0].previous_hash, GENESIS_HASH);
    }

    /// Mutating one stored field yields exactly one hash mismatch at that
    /// index — no cascading false positives on later entries.
    #[test]
    fn tampered_field_reports_single_mismatch() {
        let mut entries = make_chain(4);
        entries[1].details = "TAMPERED".to_string();

        let validation = validate_chain(&entries);

        assert!(!validation.valid);
        assert_eq!(validation.violations.len(), 1);
        match &validation.violations[0] {
            ChainViolation::HashMismatch { index, entry_id, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(entry_id, &entries[1].entry_id);
            }
            other => panic!("expected HashMismatch, got {:?}", other),
        }
    }

    /// Substituting a different previous_hash yields a chain break at the
    /// correct index, and only there.
    #[test]
    fn broken_link_reports_chain_break() {
        let mut entries = make_chain(4);
        entries[2].previous_hash = "0000".to_string();

        let validation = validate_chain(&entries);

        assert!(!validation.valid);
        assert_eq!(validation.violations.len(), 1);
        match &validation.violations[0] {
            ChainViolation::ChainBreak {
                index,
                actual_previous,
                ..
            } => {
                assert_eq!(*index, 2);
                assert_eq!(actual_previous, "0000");
            }
            other => panic!("expected ChainBreak, got {:?}", other),
        }
    }

    /// An entry can fail both checks at once; both violations are reported
    /// for the same index.
    #[test]
    fn both_violations_reported_independently() {
        let mut entries = make_chain(3);
        entries[1].previous_hash = "bogus".to_string();
        entries[1].details = "also tampered".to_string();

        let validation = validate_chain(&entries);

        assert_eq!(validation.violations.len(), 2);
        assert!(validation.violations.iter().all(|v| v.index() == 1));
    }

    /// Hashes survive a JSON round trip: reloading an entry from its line
    /// representation reproduces the stored hash on recomputation.
    #[test]
    fn hash_stable_across_serde_round_trip() {
        let entries = make_chain(3);
        let lines: Vec<String> = entries
            .iter()
            .map(|e| serde_json::to_string(e).unwrap())
            .collect();

        let reloaded: Vec<Entry> = lines
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert!(validate_chain(&reloaded).valid);
    }
}
