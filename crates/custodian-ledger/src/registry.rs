//! The process-wide registry of named ledger stores.
//!
//! `LedgerRegistry` replaces a module-global singleton map: it is an
//! explicit object the composition root constructs and owns, with its
//! lifecycle tied to that root. One store per name; stores for different
//! names are fully independent.
//!
//! The registry also carries the per-channel convenience recorders
//! (modules, nodes, equipment, domains, users, system) and the cross-ledger
//! aggregate views (recent activity, validate-all).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use custodian_contracts::entry::{ActionReport, Entry};
use custodian_contracts::error::CustodianResult;
use custodian_contracts::report::ChainValidation;

use crate::store::{EntryQuery, LedgerStore};

/// One entry from a cross-ledger activity view, tagged with the chain it
/// came from.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    /// The ledger the entry lives in.
    pub ledger: String,

    /// The entry itself.
    pub entry: Entry,
}

/// Registry of named `LedgerStore`s sharing one data directory.
pub struct LedgerRegistry {
    data_dir: PathBuf,
    stores: Mutex<HashMap<String, Arc<LedgerStore>>>,
}

impl LedgerRegistry {
    /// Create a registry rooted at `data_dir`. No stores are opened yet.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// The directory all of this registry's ledgers live under.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Return the store for `name`, opening (and loading) it on first
    /// request. Idempotent: repeated calls return the same instance.
    pub fn open(&self, name: &str) -> CustodianResult<Arc<LedgerStore>> {
        let mut stores = self.stores.lock().expect("ledger registry lock poisoned");

        if let Some(store) = stores.get(name) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(LedgerStore::open(name, &self.data_dir)?);
        stores.insert(name.to_string(), Arc::clone(&store));
        debug!(ledger = %name, "store opened and registered");
        Ok(store)
    }

    /// Drop the named store from the registry, returning it if present.
    ///
    /// Used by the governed deletion workflow after the store's files have
    /// been destroyed; the next `open` of the same name starts a fresh,
    /// empty chain.
    pub fn remove(&self, name: &str) -> Option<Arc<LedgerStore>> {
        self.stores
            .lock()
            .expect("ledger registry lock poisoned")
            .remove(name)
    }

    /// Names of all currently open ledgers.
    pub fn open_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .stores
            .lock()
            .expect("ledger registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    // ── Per-channel convenience recorders ─────────────────────────────────────

    fn record_to(
        &self,
        ledger: &str,
        action_type: &str,
        action: &str,
        target: &str,
        details: &str,
        actor_id: &str,
        subject_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.open(ledger)?.record_action(ActionReport {
            action_type: action_type.to_string(),
            action: action.to_string(),
            target: target.to_string(),
            details: details.to_string(),
            actor_id: actor_id.to_string(),
            subject_id,
            metadata,
        })
    }

    /// Record a module-related action in the `modules` ledger.
    pub fn record_module_action(
        &self,
        action: &str,
        module_name: &str,
        details: &str,
        actor_id: &str,
        subject_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.record_to(
            "modules", "module", action, module_name, details, actor_id, subject_id, metadata,
        )
    }

    /// Record a node-related action in the `nodes` ledger.
    pub fn record_node_action(
        &self,
        action: &str,
        node_name: &str,
        details: &str,
        actor_id: &str,
        subject_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.record_to(
            "nodes", "node", action, node_name, details, actor_id, subject_id, metadata,
        )
    }

    /// Record an equipment-related action in the `equipment` ledger.
    pub fn record_equipment_action(
        &self,
        action: &str,
        equipment_name: &str,
        details: &str,
        actor_id: &str,
        subject_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.record_to(
            "equipment",
            "equipment",
            action,
            equipment_name,
            details,
            actor_id,
            subject_id,
            metadata,
        )
    }

    /// Record a domain-related action in the `domains` ledger.
    pub fn record_domain_action(
        &self,
        action: &str,
        domain_name: &str,
        details: &str,
        actor_id: &str,
        subject_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.record_to(
            "domains", "domain", action, domain_name, details, actor_id, subject_id, metadata,
        )
    }

    /// Record a user-management action in the `users` ledger.
    pub fn record_user_action(
        &self,
        action: &str,
        target_user: &str,
        details: &str,
        actor_id: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.record_to(
            "users", "user", action, target_user, details, actor_id, None, metadata,
        )
    }

    /// Record a system-level action in the `system` ledger.
    pub fn record_system_action(
        &self,
        action: &str,
        component: &str,
        details: &str,
        actor_id: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> CustodianResult<String> {
        self.record_to(
            "system", "system", action, component, details, actor_id, None, metadata,
        )
    }

    // ── Cross-ledger views ────────────────────────────────────────────────────

    /// Recent entries across every open ledger, newest first, tagged with
    /// their source ledger name.
    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        let stores: Vec<Arc<LedgerStore>> = self
            .stores
            .lock()
            .expect("ledger registry lock poisoned")
            .values()
            .cloned()
            .collect();

        let per_ledger = EntryQuery {
            // Enough from each chain to fill the merged view.
            limit,
            ..EntryQuery::default()
        };

        let mut activities: Vec<ActivityEntry> = stores
            .iter()
            .flat_map(|store| {
                store
                    .get_entries(&per_ledger)
                    .into_iter()
                    .map(move |entry| ActivityEntry {
                        ledger: store.name().to_string(),
                        entry,
                    })
            })
            .collect();

        activities.sort_by(|a, b| b.entry.timestamp.cmp(&a.entry.timestamp));
        activities.truncate(limit);
        activities
    }

    /// Chain validation result for every open ledger.
    pub fn validate_all(&self) -> BTreeMap<String, ChainValidation> {
        let stores: Vec<Arc<LedgerStore>> = self
            .stores
            .lock()
            .expect("ledger registry lock poisoned")
            .values()
            .cloned()
            .collect();

        debug!(ledgers = stores.len(), at = %Utc::now(), "validating all open ledgers");

        stores
            .into_iter()
            .map(|store| (store.name().to_string(), store.validate_chain()))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
