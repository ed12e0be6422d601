//! Deletion authorization: attempt trail plus deterministic prefix checks.
//!
//! Every authorization call — granted or denied — appends an attempt record
//! to the ledger's authorization trail *before* any decision logic runs.
//! Attempts are evidence regardless of outcome. An attempt-log write
//! failure is logged as a warning and does not change the decision:
//! evidence-logging failures neither grant nor deny.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use custodian_contracts::deletion::AuthAttempt;
use custodian_contracts::error::{CustodianError, CustodianResult};
use custodian_ledger::LedgerStore;

use crate::policy::AuthPolicy;

/// Path of the named ledger's append-only authorization-attempt trail.
pub fn auth_trail_path(data_dir: &Path, ledger: &str) -> PathBuf {
    data_dir.join(format!("{ledger}_auth.jsonl"))
}

/// Append one serialized record as a JSON line, flushed to disk.
pub(crate) fn append_json_line<T: Serialize>(path: &Path, record: &T) -> std::io::Result<()> {
    let line = serde_json::to_string(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.sync_data()
}

/// Decide whether `requested_by` may delete the given ledger.
///
/// The attempt is logged first, unconditionally. Then the rules:
///
/// 1. `requested_by` must carry a recognized requester prefix.
/// 2. For critical ledgers, `supervisor_id` must be present and carry a
///    recognized supervisor prefix.
///
/// Deterministic and side-effect-free beyond the attempt log.
pub fn authorize_deletion(
    policy: &AuthPolicy,
    store: &LedgerStore,
    requested_by: &str,
    reason: &str,
    supervisor_id: Option<&str>,
) -> bool {
    let attempt = AuthAttempt {
        attempt_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        ledger: store.name().to_string(),
        requested_by: requested_by.to_string(),
        supervisor_id: supervisor_id.map(str::to_string),
        reason: reason.to_string(),
    };

    let trail = auth_trail_path(store.data_dir(), store.name());
    if let Err(e) = append_json_line(&trail, &attempt) {
        warn!(
            ledger = %store.name(),
            path = %trail.display(),
            error = %e,
            "could not log authorization attempt"
        );
    }

    if !policy.requester_recognized(requested_by) {
        warn!(
            ledger = %store.name(),
            requested_by = %requested_by,
            "deletion denied: unrecognized requester credential"
        );
        return false;
    }

    if policy.is_critical(store.name()) {
        let supervisor_ok = supervisor_id
            .map(|id| policy.supervisor_recognized(id))
            .unwrap_or(false);
        if !supervisor_ok {
            warn!(
                ledger = %store.name(),
                requested_by = %requested_by,
                supervisor_id = ?supervisor_id,
                "deletion denied: critical ledger requires supervisor sign-off"
            );
            return false;
        }
    }

    info!(
        ledger = %store.name(),
        requested_by = %requested_by,
        supervisor_id = ?supervisor_id,
        "ledger deletion authorized"
    );
    true
}

/// [`authorize_deletion`] expressed as a result, for callers that
/// propagate: a denial becomes `CustodianError::AuthorizationDenied`.
pub fn check_authorization(
    policy: &AuthPolicy,
    store: &LedgerStore,
    requested_by: &str,
    reason: &str,
    supervisor_id: Option<&str>,
) -> CustodianResult<()> {
    if authorize_deletion(policy, store, requested_by, reason, supervisor_id) {
        Ok(())
    } else {
        Err(CustodianError::AuthorizationDenied {
            reason: format!(
                "deletion of ledger '{}' not authorized for '{requested_by}'",
                store.name()
            ),
        })
    }
}
