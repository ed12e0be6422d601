//! # custodian-ledger
//!
//! File-backed, SHA-256 hash-chained, append-only ledger store.
//!
//! ## Overview
//!
//! Every action a caller reports is sealed into an [`Entry`] that links to
//! the previous entry via its SHA-256 hash. Tampering with any stored entry
//! — even a single byte — breaks the chain and is detected by
//! [`LedgerStore::validate_chain`]. Entries are durable before they are
//! visible: an append that cannot reach disk publishes nothing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custodian_ledger::{LedgerRegistry, EntryQuery};
//!
//! let registry = LedgerRegistry::new("data/ledger");
//! let ops = registry.open("ops")?;
//!
//! let entry_id = ops.record_action(report)?;
//! assert!(ops.validate_chain().valid);
//! let recent = ops.get_entries(&EntryQuery::default());
//! ```
//!
//! [`Entry`]: custodian_contracts::entry::Entry

pub mod chain;
pub mod index;
pub mod registry;
pub mod store;

pub use chain::{hash_report, seal_entry, validate_chain};
pub use index::LedgerIndex;
pub use registry::{ActivityEntry, LedgerRegistry};
pub use store::{ChainSnapshot, EntryQuery, LedgerStore};

// ── Tests ─────────────────────────────────────────────────────────────────────
