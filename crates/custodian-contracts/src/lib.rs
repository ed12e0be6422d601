//! # custodian-contracts
//!
//! Shared types and contracts for the Custodian audit ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod deletion;
pub mod entry;
pub mod error;
pub mod report;
pub mod transfer;
