//! Transfer package types.
//!
//! A `TransferPackage` is a bounded snapshot of a chain's recent state —
//! tail entries, integrity proof, stats — suitable for bootstrapping the
//! ledger's history on another system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::report::{ChainValidation, LedgerStats};

/// A bootstrap snapshot of one ledger's recent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPackage {
    /// When the package was built (UTC).
    pub transfer_timestamp: DateTime<Utc>,

    /// The ledger this package was built from.
    pub source_ledger: String,

    /// Total entries in the source chain at build time.
    pub total_entries: usize,

    /// The `entry_hash` of the source chain's final entry.
    pub final_hash: String,

    /// The final entries of the chain, for chain continuation on the
    /// receiving side.
    pub bootstrap_entries: Vec<Entry>,

    /// Full chain validation result at build time — the integrity proof.
    pub validation: ChainValidation,

    /// Timestamp of the source chain's first entry.
    pub first_entry: Option<DateTime<Utc>>,

    /// Timestamp of the source chain's last entry.
    pub last_entry: Option<DateTime<Utc>>,

    /// Aggregate statistics at build time.
    pub stats: LedgerStats,
}
