//! The four governance demo scenarios and their shared wiring.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use custos_audit::MemoryLedger;
use custos_canon::ConstraintStore;
use custos_contracts::{
    canon::ObjectiveId,
    error::CustosResult,
    intent::{AccessMode, Intent, IntentId, IntentPayload},
    scope::ScopePattern,
};
use custos_core::{GovernanceKernel, KernelConfig, LogNotifier};

pub mod no_harm;
pub mod priority_tie;
pub mod rollback;
pub mod timeout;

// ── Embedded constraint set ───────────────────────────────────────────────────

/// The demo constraint set: one hard prohibition, one soft preference, and a
/// two-level objective forest.
const DEMO_CANON: &str = r#"
scope_roots = ["objectives", "infrastructure"]

[[axioms]]
id = "no_harm"
version = 1
priority = 100
kind = "prohibition"
scope = "objectives/*"
condition = { check = "param-equals", key = "action", value = "disable_safety" }
enforcement = "hard"
created_at = "2025-01-01T00:00:00Z"
created_by = "governance-board"

[[axioms]]
id = "prefer_gradual"
version = 1
priority = 40
kind = "prohibition"
scope = "objectives/weights/*"
condition = { check = "context-flag", flag = "bulk-update" }
enforcement = "soft"
created_at = "2025-01-01T00:00:00Z"
created_by = "governance-board"

[[objectives]]
id = "stability"
priority = 50
axiom_refs = ["no_harm"]

[[objectives]]
id = "throughput"
priority = 30
parent = "stability"
"#;

// ── Shared wiring ─────────────────────────────────────────────────────────────

/// Build a kernel over the demo constraint set, keeping a ledger handle for
/// inspection after the run.
pub fn build_kernel(config: KernelConfig) -> CustosResult<(GovernanceKernel, MemoryLedger)> {
    let canon = Arc::new(ConstraintStore::from_toml_str(DEMO_CANON)?);
    let ledger = MemoryLedger::new();
    let kernel = GovernanceKernel::new(
        canon,
        Arc::new(ledger.clone()),
        Arc::new(LogNotifier),
        config,
    );
    Ok((kernel, ledger))
}

/// A write intent from the planner against the demo state tree.
pub fn make_intent(
    id: &str,
    scope: &str,
    priority: i64,
    objective: &str,
    params: serde_json::Value,
) -> Intent {
    Intent {
        id: IntentId::new(id),
        origin: "planner".to_string(),
        timestamp: Utc::now(),
        priority,
        deadline: None,
        objective: Some(ObjectiveId::new(objective)),
        payload: IntentPayload {
            action: "adjust_weights".to_string(),
            scope: ScopePattern::new(scope),
            mode: AccessMode::Write,
            params,
        },
    }
}

/// The governed state the rollback scenario starts from.
pub fn seed_state() -> custos_state::GovernedState {
    custos_state::GovernedState::new(json!({
        "objectives": {
            "weights": { "alpha": 0.5, "beta": 0.5 },
            "mode": "steady"
        },
        "infrastructure": { "replicas": 3 }
    }))
}
