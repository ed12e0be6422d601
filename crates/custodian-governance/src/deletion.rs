//! The governed, two-phase destructive-delete workflow.
//!
//! Step ordering is strict and no step is skippable:
//!
//! 1. Authorize (attempt-logged). Failure aborts with nothing written to
//!    the deletion-audit trail.
//! 2. Write the deletion-audit record durably. Failure aborts the entire
//!    deletion — a ledger may never be deleted without a durable audit
//!    record.
//! 3. Copy the backing file to a read-only backup (best-effort).
//! 4. Clear filesystem write-protection on the backing file (best-effort).
//! 5. Remove the backing file and index snapshot, reset the chain, drop
//!    the store from the registry.
//!
//! Once step 5 begins, the audit trail already exists durably — there is
//! no reachable partial-deletion state.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use custodian_contracts::deletion::{DeletionAuditRecord, DeletionOutcome};
use custodian_contracts::error::{CustodianError, CustodianResult};
use custodian_ledger::LedgerRegistry;

use crate::authorize::{append_json_line, check_authorization};
use crate::policy::AuthPolicy;

/// How many final entries a deletion-audit record keeps — a bounded tail,
/// not the full chain.
pub const FINAL_ENTRIES_KEPT: usize = 10;

/// Path of the shared, cross-ledger deletion-audit trail.
pub fn deletion_audit_path(data_dir: &Path) -> PathBuf {
    data_dir.join("deletion_audit.jsonl")
}

/// Delete the named ledger with full authorization and audit trail.
///
/// Returns `Ok(Deleted { .. })` when all steps complete, or
/// `Ok(Aborted { .. })` when authorization fails — callers branch on the
/// outcome routinely, so a denial is data, not an error. The one error that
/// always escalates is `CustodianError::AuditWriteFailure`: the mandatory
/// deletion-audit record could not be written, so nothing was deleted.
///
/// Appends to the chain must not run concurrently with its deletion; the
/// store's write lock serializes the final destructive step against any
/// in-flight append.
pub fn delete_ledger(
    policy: &AuthPolicy,
    registry: &LedgerRegistry,
    name: &str,
    requested_by: &str,
    reason: &str,
    supervisor_id: Option<&str>,
) -> CustodianResult<DeletionOutcome> {
    let store = registry.open(name)?;

    // ── Step 1: authorization ─────────────────────────────────────────────
    //
    // A denial is data at this boundary, not an error: callers branch on
    // the Aborted outcome routinely.
    if let Err(denied) = check_authorization(policy, &store, requested_by, reason, supervisor_id) {
        return Ok(DeletionOutcome::Aborted {
            reason: denied.to_string(),
        });
    }

    // ── Step 2: durable deletion-audit record ─────────────────────────────
    let snapshot = store.snapshot(FINAL_ENTRIES_KEPT);
    let record = DeletionAuditRecord {
        deletion_id: Uuid::new_v4(),
        deleted_at: Utc::now(),
        ledger: name.to_string(),
        authorized_by: requested_by.to_string(),
        supervisor_id: supervisor_id.map(str::to_string),
        reason: reason.to_string(),
        validation: snapshot.validation,
        stats: snapshot.stats,
        final_entries: snapshot.tail,
    };

    let trail = deletion_audit_path(registry.data_dir());
    append_json_line(&trail, &record).map_err(|e| CustodianError::AuditWriteFailure {
        reason: format!(
            "could not write deletion-audit record to {}: {e}",
            trail.display()
        ),
    })?;

    info!(
        ledger = %name,
        deletion_id = %record.deletion_id,
        entries = record.stats.total_entries,
        "deletion-audit record written"
    );

    // ── Step 3: read-only backup (best-effort) ────────────────────────────
    if store.ledger_path().exists() {
        let backup = registry.data_dir().join(format!(
            "FINAL_BACKUP_{name}_{}.jsonl",
            Utc::now().timestamp()
        ));
        match fs::copy(store.ledger_path(), &backup) {
            Ok(_) => {
                mark_read_only(&backup);
                info!(ledger = %name, backup = %backup.display(), "final backup created");
            }
            Err(e) => {
                // Step 2 already preserved the essential evidence.
                warn!(ledger = %name, error = %e, "could not create final backup");
            }
        }
    }

    // ── Step 4: clear write-protection (best-effort) ──────────────────────
    clear_write_protection(store.ledger_path());

    // ── Step 5: irreversible removal ──────────────────────────────────────
    store.wipe()?;
    registry.remove(name);

    info!(
        ledger = %name,
        requested_by = %requested_by,
        reason = %reason,
        "ledger deleted"
    );

    Ok(DeletionOutcome::Deleted {
        deletion_id: record.deletion_id,
    })
}

/// Read back every record in the deletion-audit trail, oldest first.
///
/// Returns an empty list when no deletion has ever been performed.
pub fn read_deletion_audit(data_dir: &Path) -> CustodianResult<Vec<DeletionAuditRecord>> {
    let path = deletion_audit_path(data_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents = fs::read_to_string(&path)?;
    let mut records = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|e| CustodianError::ConfigError {
            reason: format!("malformed deletion-audit record in {}: {e}", path.display()),
        })?;
        records.push(record);
    }
    Ok(records)
}

fn mark_read_only(path: &Path) {
    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        perms.set_readonly(true);
        fs::set_permissions(path, perms)
    });
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "could not mark backup read-only");
    }
}

fn clear_write_protection(path: &Path) {
    if !path.exists() {
        return;
    }
    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        if !perms.readonly() {
            return Ok(());
        }
        perms.set_readonly(false);
        fs::set_permissions(path, perms)
    });
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "could not clear write-protection");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
