//! Ledger entry types.
//!
//! `Entry` is one immutable record in a named hash chain — the seven business
//! fields a caller reports, plus the chaining fields (`previous_hash`,
//! `entry_hash`) and a human-facing `entry_id`. `ActionReport` is the
//! caller-supplied half of an `Entry`, before it has been chained and hashed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The sentinel `previous_hash` used for the first entry in every chain.
///
/// The literal string `"0"` — a value that can never be a SHA-256 hex digest,
/// making genesis detection unambiguous.
pub const GENESIS_HASH: &str = "0";

/// The caller-supplied fields of one reported action.
///
/// Callers construct this and hand it to the store; the store stamps the
/// timestamp, chains it to the previous entry, and seals it into an `Entry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    /// Open-ended category: "module", "node", "equipment", "domain", "user",
    /// "system", or any new category a caller defines.
    pub action_type: String,

    /// The verb: "create", "update", "delete", "deploy", "validate", ...
    pub action: String,

    /// Identifier of the thing acted upon.
    pub target: String,

    /// Free-text human description of what happened.
    pub details: String,

    /// Who or what performed the action.
    pub actor_id: String,

    /// Optional cross-reference identifier relevant to the action
    /// (e.g. a resource's stable ID).
    pub subject_id: Option<String>,

    /// Open mapping for fields that vary by action type. A `BTreeMap` keeps
    /// key order canonical, so the same logical report always hashes
    /// identically regardless of how the caller built the map.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A single entry in a named ledger's SHA-256 hash chain.
///
/// Each entry commits to its predecessor via `previous_hash`, forming an
/// append-only chain. Modifying any field — including a metadata value —
/// invalidates `entry_hash` and every subsequent `previous_hash`, which
/// `validate_chain` detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Display identifier: `led_<unix millis>_<first 8 hash chars>`.
    /// Used for human lookup and log correlation, never for integrity.
    pub entry_id: String,

    /// Wall-clock time (UTC) the entry was recorded.
    pub timestamp: DateTime<Utc>,

    /// Category the caller filed this action under.
    pub action_type: String,

    /// The verb.
    pub action: String,

    /// What was acted upon.
    pub target: String,

    /// Human-readable description.
    pub details: String,

    /// Who performed the action.
    pub actor_id: String,

    /// Optional cross-reference identifier.
    pub subject_id: Option<String>,

    /// Caller-defined structured data, canonical key order.
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// SHA-256 hex of the previous entry, or `GENESIS_HASH` for the first.
    pub previous_hash: String,

    /// SHA-256 hex digest over this entry's canonical content.
    pub entry_hash: String,
}

impl Entry {
    /// The `ActionReport` view of this entry's business fields.
    ///
    /// Used when recomputing the entry's hash during validation.
    pub fn report(&self) -> ActionReport {
        ActionReport {
            action_type: self.action_type.clone(),
            action: self.action.clone(),
            target: self.target.clone(),
            details: self.details.clone(),
            actor_id: self.actor_id.clone(),
            subject_id: self.subject_id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}
