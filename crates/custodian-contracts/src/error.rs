//! Error types for the Custodian ledger.
//!
//! All fallible operations return `CustodianResult<T>`. Variants carry
//! enough context to produce actionable log lines. Chain-integrity findings
//! are NOT errors — they are data (`ChainValidation`), since callers are
//! expected to inspect them routinely.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type for the Custodian crates.
#[derive(Debug, Error)]
pub enum CustodianError {
    /// A ledger's backing file could not be read at load time and was
    /// quarantined under a timestamped name. The chain restarted empty;
    /// the corrupt file is preserved as evidence.
    #[error("ledger '{ledger}' backing file was corrupt; quarantined to {}", .quarantined_to.display())]
    CorruptionRecovered {
        ledger: String,
        quarantined_to: PathBuf,
    },

    /// An entry could not be made durable. The append failed atomically:
    /// the chain is exactly as it was before the call.
    #[error("ledger write failed: {reason}")]
    WriteFailure { reason: String },

    /// A destructive operation was requested without valid credentials.
    /// The attempt is always logged before this is returned.
    #[error("deletion not authorized: {reason}")]
    AuthorizationDenied { reason: String },

    /// The mandatory deletion-audit record could not be written. The
    /// deletion is aborted unconditionally — a ledger may never be deleted
    /// without a durable audit record.
    #[error("deletion-audit write failed, deletion aborted: {reason}")]
    AuditWriteFailure { reason: String },

    /// A transfer package was requested for a chain with no entries.
    #[error("ledger '{ledger}' has no entries to transfer")]
    EmptyChain { ledger: String },

    /// A governance policy file is missing or malformed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A filesystem error with no more specific classification.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the Custodian crates.
pub type CustodianResult<T> = Result<T, CustodianError>;
