//! Custodian — Demo CLI
//!
//! Drives a `LedgerRegistry` rooted at a data directory: records actions,
//! queries and validates chains, prints stats, builds transfer packages,
//! and exercises the governed deletion workflow.
//!
//! Usage:
//!   cargo run -p demo -- seed
//!   cargo run -p demo -- record --ledger ops --action-type system --action start --target custodian --actor ADM-1
//!   cargo run -p demo -- entries --ledger ops --limit 10
//!   cargo run -p demo -- validate --ledger ops
//!   cargo run -p demo -- delete --ledger ops --requested-by ADM-1 --reason cleanup

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use custodian_contracts::deletion::DeletionOutcome;
use custodian_contracts::entry::ActionReport;
use custodian_contracts::error::{CustodianError, CustodianResult};
use custodian_governance::{delete_ledger, AuthPolicy};
use custodian_ledger::{EntryQuery, LedgerRegistry};
use custodian_transfer::build_transfer_package;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Custodian — hash-chained audit ledger demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Custodian audit ledger demo",
    long_about = "Records actions into hash-chained, append-only ledgers and\n\
                  demonstrates validation, stats, transfer, and governed deletion."
)]
struct Cli {
    /// Directory the ledger files live under.
    #[arg(long, default_value = "data/ledger", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one action into a named ledger.
    Record {
        #[arg(long)]
        ledger: String,
        #[arg(long)]
        action_type: String,
        #[arg(long)]
        action: String,
        #[arg(long)]
        target: String,
        #[arg(long, default_value = "")]
        details: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        subject: Option<String>,
        /// Metadata as KEY=VALUE pairs; VALUE is parsed as JSON when
        /// possible, kept as a string otherwise.
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },
    /// Seed the standard channels with a few sample actions.
    Seed,
    /// List entries from a ledger, newest first.
    Entries {
        #[arg(long)]
        ledger: String,
        #[arg(long)]
        action_type: Option<String>,
        #[arg(long)]
        actor: Option<String>,
        /// Only entries at or after this RFC 3339 time.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Only entries at or before this RFC 3339 time.
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Validate a ledger's hash chain (or every open standard channel).
    Validate {
        #[arg(long)]
        ledger: Option<String>,
    },
    /// Print a ledger's aggregate statistics.
    Stats {
        #[arg(long)]
        ledger: String,
    },
    /// Show recent activity merged across the standard channels.
    Activity {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Build a bootstrap transfer package for a ledger.
    Transfer {
        #[arg(long)]
        ledger: String,
    },
    /// Delete a ledger through the governed workflow.
    Delete {
        #[arg(long)]
        ledger: String,
        #[arg(long)]
        requested_by: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        supervisor: Option<String>,
        /// Optional TOML file overriding the default auth policy.
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

/// The channels the seed/activity/validate-all commands open by default.
const STANDARD_CHANNELS: &[&str] = &["modules", "nodes", "domains", "equipment", "users", "system"];

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging; set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let registry = LedgerRegistry::new(&cli.data_dir);

    let result = match cli.command {
        Command::Record {
            ledger,
            action_type,
            action,
            target,
            details,
            actor,
            subject,
            metadata,
        } => run_record(
            &registry,
            &ledger,
            ActionReport {
                action_type,
                action,
                target,
                details,
                actor_id: actor,
                subject_id: subject,
                metadata: parse_metadata(&metadata),
            },
        ),
        Command::Seed => run_seed(&registry),
        Command::Entries {
            ledger,
            action_type,
            actor,
            since,
            until,
            limit,
            offset,
        } => run_entries(
            &registry,
            &ledger,
            EntryQuery {
                limit,
                offset,
                action_type,
                actor_id: actor,
                start_time: since,
                end_time: until,
            },
        ),
        Command::Validate { ledger } => run_validate(&registry, ledger.as_deref()),
        Command::Stats { ledger } => run_stats(&registry, &ledger),
        Command::Activity { limit } => run_activity(&registry, limit),
        Command::Transfer { ledger } => run_transfer(&registry, &ledger),
        Command::Delete {
            ledger,
            requested_by,
            reason,
            supervisor,
            policy,
        } => run_delete(
            &registry,
            &ledger,
            &requested_by,
            &reason,
            supervisor.as_deref(),
            policy.as_deref(),
        ),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

// ── Command handlers ──────────────────────────────────────────────────────────

fn run_record(registry: &LedgerRegistry, ledger: &str, report: ActionReport) -> CustodianResult<()> {
    let entry_id = registry.open(ledger)?.record_action(report)?;
    println!("recorded: {entry_id}");
    Ok(())
}

fn run_seed(registry: &LedgerRegistry) -> CustodianResult<()> {
    registry.record_system_action(
        "start",
        "custodian",
        "system startup",
        "ADM-1",
        BTreeMap::from([("version".to_string(), serde_json::json!("2.0"))]),
    )?;
    registry.record_module_action(
        "scan",
        "compliance",
        "module discovery scan",
        "ADM-1",
        Some("MOD-12345".to_string()),
        BTreeMap::new(),
    )?;
    registry.record_node_action(
        "register",
        "raspberry-pi-001",
        "new node registered",
        "ADM-1",
        Some("NOD-67890".to_string()),
        BTreeMap::new(),
    )?;
    registry.record_domain_action(
        "create",
        "packaging-line-a",
        "domain provisioned",
        "STF-0042",
        None,
        BTreeMap::new(),
    )?;
    registry.record_equipment_action(
        "validate",
        "filler-unit-3",
        "equipment validation passed",
        "STF-0042",
        Some("EQP-00017".to_string()),
        BTreeMap::new(),
    )?;

    println!("seeded {} ledgers", registry.open_names().len());
    for (name, validation) in registry.validate_all() {
        println!(
            "  {name}: {} entries, valid={}",
            validation.total_entries, validation.valid
        );
    }
    Ok(())
}

fn run_entries(registry: &LedgerRegistry, ledger: &str, query: EntryQuery) -> CustodianResult<()> {
    let entries = registry.open(ledger)?.get_entries(&query);
    if entries.is_empty() {
        println!("no matching entries");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}  {}.{}  {}  by {}  {}",
            entry.entry_id,
            entry.timestamp.to_rfc3339(),
            entry.action_type,
            entry.action,
            entry.target,
            entry.actor_id,
            entry.details,
        );
    }
    Ok(())
}

fn run_validate(registry: &LedgerRegistry, ledger: Option<&str>) -> CustodianResult<()> {
    match ledger {
        Some(name) => {
            let validation = registry.open(name)?.validate_chain();
            print_json(&validation)
        }
        None => {
            for name in STANDARD_CHANNELS {
                registry.open(name)?;
            }
            print_json(&registry.validate_all())
        }
    }
}

fn run_stats(registry: &LedgerRegistry, ledger: &str) -> CustodianResult<()> {
    let stats = registry.open(ledger)?.get_stats();
    print_json(&stats)
}

fn run_activity(registry: &LedgerRegistry, limit: usize) -> CustodianResult<()> {
    for name in STANDARD_CHANNELS {
        registry.open(name)?;
    }
    for activity in registry.recent_activity(limit) {
        println!(
            "[{}] {}  {}.{}  {}  by {}",
            activity.ledger,
            activity.entry.timestamp.to_rfc3339(),
            activity.entry.action_type,
            activity.entry.action,
            activity.entry.target,
            activity.entry.actor_id,
        );
    }
    Ok(())
}

fn run_transfer(registry: &LedgerRegistry, ledger: &str) -> CustodianResult<()> {
    let store = registry.open(ledger)?;
    let package = build_transfer_package(&store)?;
    print_json(&package)
}

fn run_delete(
    registry: &LedgerRegistry,
    ledger: &str,
    requested_by: &str,
    reason: &str,
    supervisor: Option<&str>,
    policy_path: Option<&std::path::Path>,
) -> CustodianResult<()> {
    let policy = match policy_path {
        Some(path) => AuthPolicy::from_file(path)?,
        None => AuthPolicy::default(),
    };

    match delete_ledger(&policy, registry, ledger, requested_by, reason, supervisor)? {
        DeletionOutcome::Deleted { deletion_id } => {
            println!("ledger '{ledger}' deleted (audit record {deletion_id})");
        }
        DeletionOutcome::Aborted { reason } => {
            println!("deletion aborted: {reason}");
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Parse `KEY=VALUE` pairs; values that parse as JSON are kept structured,
/// anything else becomes a JSON string.
fn parse_metadata(pairs: &[String]) -> BTreeMap<String, serde_json::Value> {
    pairs
        .iter()
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            Some((key.to_string(), value))
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> CustodianResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CustodianError::WriteFailure {
        reason: format!("failed to render output: {e}"),
    })?;
    println!("{json}");
    Ok(())
}
