//! # custodian-governance
//!
//! Authorization policy and the governed deletion workflow for Custodian
//! ledgers.
//!
//! Destructive operations on a ledger are gated twice: a deterministic
//! credential-prefix check (every attempt logged to an append-only trail),
//! and a mandatory, durably written deletion-audit record that must exist
//! before any file is removed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custodian_governance::{AuthPolicy, delete_ledger};
//!
//! let policy = AuthPolicy::default();
//! match delete_ledger(&policy, &registry, "ops", "ADM-1", "decommissioned", None)? {
//!     DeletionOutcome::Deleted { deletion_id } => println!("deleted: {deletion_id}"),
//!     DeletionOutcome::Aborted { reason } => println!("refused: {reason}"),
//! }
//! ```

pub mod authorize;
pub mod deletion;
pub mod policy;

pub use authorize::{auth_trail_path, authorize_deletion, check_authorization};
pub use deletion::{delete_ledger, deletion_audit_path, read_deletion_audit, FINAL_ENTRIES_KEPT};
pub use policy::AuthPolicy;
