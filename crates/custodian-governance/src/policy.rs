//! Deletion authorization policy and its TOML configuration schema.
//!
//! An `AuthPolicy` names the credential prefixes recognized for requesters
//! and supervisors, plus the set of "critical" ledgers whose deletion
//! additionally requires supervisor sign-off. The compiled-in defaults
//! cover the standard credential scheme; deployments override them with a
//! TOML file.
//!
//! Example:
//! ```toml
//! requester_prefixes = ["STF-", "ADM-", "DEV-"]
//! supervisor_prefixes = ["SUP-", "ADM-"]
//! critical_ledgers = ["production", "audit", "compliance", "vault", "nodes"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use custodian_contracts::error::{CustodianError, CustodianResult};

fn default_requester_prefixes() -> Vec<String> {
    vec!["STF-".to_string(), "ADM-".to_string(), "DEV-".to_string()]
}

fn default_supervisor_prefixes() -> Vec<String> {
    vec!["SUP-".to_string(), "ADM-".to_string()]
}

fn default_critical_ledgers() -> Vec<String> {
    ["production", "audit", "compliance", "vault", "nodes"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The credential-prefix scheme gating destructive ledger operations.
///
/// Checks are deterministic string-prefix matches; a missing or malformed
/// credential always denies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPolicy {
    /// Prefixes a `requested_by` credential may carry (staff, admin,
    /// developer).
    #[serde(default = "default_requester_prefixes")]
    pub requester_prefixes: Vec<String>,

    /// Prefixes a `supervisor_id` credential must carry for critical
    /// ledgers.
    #[serde(default = "default_supervisor_prefixes")]
    pub supervisor_prefixes: Vec<String>,

    /// Ledger names whose deletion requires supervisor sign-off.
    #[serde(default = "default_critical_ledgers")]
    pub critical_ledgers: Vec<String>,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            requester_prefixes: default_requester_prefixes(),
            supervisor_prefixes: default_supervisor_prefixes(),
            critical_ledgers: default_critical_ledgers(),
        }
    }
}

impl AuthPolicy {
    /// Parse `s` as a TOML policy document.
    ///
    /// Returns `CustodianError::ConfigError` if the TOML is malformed or
    /// does not match the schema. Omitted fields fall back to the defaults.
    pub fn from_toml_str(s: &str) -> CustodianResult<Self> {
        toml::from_str(s).map_err(|e| CustodianError::ConfigError {
            reason: format!("failed to parse auth policy TOML: {e}"),
        })
    }

    /// Read the file at `path` and parse it as a TOML policy document.
    pub fn from_file(path: &Path) -> CustodianResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CustodianError::ConfigError {
            reason: format!("failed to read auth policy file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// True when `credential` carries a recognized requester prefix.
    pub fn requester_recognized(&self, credential: &str) -> bool {
        !credential.is_empty()
            && self
                .requester_prefixes
                .iter()
                .any(|prefix| credential.starts_with(prefix.as_str()))
    }

    /// True when `credential` carries a recognized supervisor prefix.
    pub fn supervisor_recognized(&self, credential: &str) -> bool {
        !credential.is_empty()
            && self
                .supervisor_prefixes
                .iter()
                .any(|prefix| credential.starts_with(prefix.as_str()))
    }

    /// True when deleting `ledger` requires supervisor sign-off.
    pub fn is_critical(&self, ledger: &str) -> bool {
        self.critical_ledgers.iter().any(|name| name == ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_scheme() {
        let policy = AuthPolicy::default();

        assert!(policy.requester_recognized("STF-00123"));
        assert!(policy.requester_recognized("ADM-1"));
        assert!(policy.requester_recognized("DEV-42"));
        assert!(!policy.requester_recognized("guest-1"));
        assert!(!policy.requester_recognized(""));

        assert!(policy.supervisor_recognized("SUP-9"));
        assert!(policy.supervisor_recognized("ADM-9"));
        assert!(!policy.supervisor_recognized("STF-9"));

        assert!(policy.is_critical("production"));
        assert!(policy.is_critical("nodes"));
        assert!(!policy.is_critical("ops"));
    }

    #[test]
    fn toml_overrides_parse() {
        let policy = AuthPolicy::from_toml_str(
            r#"
            requester_prefixes = ["OPS-"]
            critical_ledgers = ["billing"]
            "#,
        )
        .unwrap();

        assert!(policy.requester_recognized("OPS-7"));
        assert!(!policy.requester_recognized("STF-7"));
        // Omitted field falls back to the default scheme.
        assert!(policy.supervisor_recognized("SUP-1"));
        assert!(policy.is_critical("billing"));
        assert!(!policy.is_critical("production"));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = AuthPolicy::from_toml_str("requester_prefixes = 3").unwrap_err();
        assert!(err.to_string().contains("configuration error"));
    }
}
