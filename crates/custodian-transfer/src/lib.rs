//! # custodian-transfer
//!
//! Builds bootstrap transfer packages: a bounded snapshot of a ledger's
//! tail plus its integrity proof and stats, for handing the chain's recent
//! state to another system.

pub mod builder;

pub use builder::{build_transfer_package, BOOTSTRAP_ENTRIES};
