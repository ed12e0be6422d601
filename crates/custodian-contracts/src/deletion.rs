//! Deletion governance record types.
//!
//! `AuthAttempt` is one line in a ledger's authorization-attempt trail —
//! written for every request, granted or denied, before any decision logic
//! runs. `DeletionAuditRecord` is the permanent cross-ledger record written
//! durably *before* a ledger's files are removed. `DeletionOutcome` is the
//! terminal state of a governed delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::Entry;
use crate::report::{ChainValidation, LedgerStats};

/// One authorization attempt, successful or not.
///
/// Attempts are evidence regardless of outcome; the trail is append-only and
/// separate from both the chain and the deletion-audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAttempt {
    /// Unique id for this attempt.
    pub attempt_id: Uuid,

    /// When the attempt was made (UTC).
    pub timestamp: DateTime<Utc>,

    /// The ledger the requester wants to delete.
    pub ledger: String,

    /// Credential of the requester.
    pub requested_by: String,

    /// Credential of the approving supervisor, when one was supplied.
    pub supervisor_id: Option<String>,

    /// The stated reason for the deletion request.
    pub reason: String,
}

/// The immutable record written before a ledger is destroyed.
///
/// Captures everything needed to account for the deletion after the chain
/// itself is gone: who authorized it, why, the integrity state of the chain
/// at deletion time, its stats, and a bounded tail of final entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionAuditRecord {
    /// Unique id for this deletion.
    pub deletion_id: Uuid,

    /// When the deletion was performed (UTC).
    pub deleted_at: DateTime<Utc>,

    /// The ledger that was deleted.
    pub ledger: String,

    /// Credential that authorized the deletion.
    pub authorized_by: String,

    /// Supervisor credential, when one was required and supplied.
    pub supervisor_id: Option<String>,

    /// The stated reason.
    pub reason: String,

    /// Full chain validation result at the moment of deletion.
    pub validation: ChainValidation,

    /// Ledger statistics at the moment of deletion.
    pub stats: LedgerStats,

    /// The final entries of the chain (bounded tail, not the full chain).
    pub final_entries: Vec<Entry>,
}

/// Terminal state of a governed ledger deletion.
///
/// There is no partial-deletion state: once irreversible removal begins, the
/// deletion-audit record already exists durably.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    /// All steps completed; the ledger's files are gone and its in-memory
    /// chain is empty.
    Deleted {
        /// The id of the deletion-audit record preserving the evidence.
        deletion_id: Uuid,
    },

    /// Authorization failed; nothing was written to the deletion-audit
    /// trail and the chain is untouched.
    Aborted {
        /// Why the deletion was refused.
        reason: String,
    },
}

impl DeletionOutcome {
    /// True when the ledger was actually deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeletionOutcome::Deleted { .. })
    }
}
