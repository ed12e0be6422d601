//! Transfer-package construction.
//!
//! A transfer package hands a ledger's recent state to another system: the
//! final entries for chain continuation, the full validation result as an
//! integrity proof, and the stats summary. Building one is a pure read —
//! no chain or file is modified.

use chrono::Utc;
use tracing::info;

use custodian_contracts::error::{CustodianError, CustodianResult};
use custodian_contracts::transfer::TransferPackage;
use custodian_ledger::LedgerStore;

/// How many final entries a package carries for bootstrap.
pub const BOOTSTRAP_ENTRIES: usize = 5;

/// Build a bootstrap snapshot of the store's recent state.
///
/// Returns `CustodianError::EmptyChain` when the chain has no entries — an
/// empty-chain transfer is a meaningful, reportable edge case, not a crash.
pub fn build_transfer_package(store: &LedgerStore) -> CustodianResult<TransferPackage> {
    // One locked view, so the proof, the tail, and the stats agree.
    let snapshot = store.snapshot(BOOTSTRAP_ENTRIES);
    let stats = snapshot.stats;
    if stats.total_entries == 0 {
        return Err(CustodianError::EmptyChain {
            ledger: store.name().to_string(),
        });
    }

    let package = TransferPackage {
        transfer_timestamp: Utc::now(),
        source_ledger: store.name().to_string(),
        total_entries: stats.total_entries,
        final_hash: stats.last_hash.clone(),
        bootstrap_entries: snapshot.tail,
        validation: snapshot.validation,
        first_entry: stats.first_entry,
        last_entry: stats.last_entry,
        stats,
    };

    info!(
        ledger = %package.source_ledger,
        entries = package.total_entries,
        final_hash = %package.final_hash,
        "transfer package built"
    );

    Ok(package)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
