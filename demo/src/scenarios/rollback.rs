//! Scenario 3: checkpointed release and digest-verified rollback.
//!
//! An approved intent is released against a checkpoint bracket. The executor
//! commits a weight change, then an operator rolls the governed state back
//! to the bracketing checkpoint: digests match exactly and the committed
//! intent transitions to RolledBack. A second run with an external side
//! effect shows the rollback being refused instead.

use chrono::Utc;
use serde_json::json;

use custos_audit::AuditSink;
use custos_contracts::{
    error::{CustosError, CustosResult},
    intent::{ExecutorReport, IntentId, ReportOutcome},
    validation::ValidationContext,
};
use custos_core::KernelConfig;

use super::{build_kernel, make_intent, seed_state};

pub fn run_scenario() -> CustosResult<()> {
    println!("=== Scenario 3: checkpoint and rollback ===");
    println!();

    let (kernel, ledger) = build_kernel(KernelConfig::default())?;

    let initial = seed_state();
    kernel.checkpoint(&initial, Some("genesis".into()), "kernel")?;
    println!("  Seeded state, digest {}", &initial.digest()[..16]);

    // ── A reversible commit, rolled back cleanly ──────────────────────────────

    kernel.submit(make_intent(
        "intent-shift-weights",
        "objectives/weights/alpha",
        10,
        "throughput",
        json!({ "alpha": 0.9 }),
    ))?;
    kernel.validate_intent(
        &IntentId::new("intent-shift-weights"),
        &ValidationContext::at(Utc::now()),
    )?;
    let ticket = kernel.release(&IntentId::new("intent-shift-weights"))?;
    println!("  Released against checkpoint {}", ticket.checkpoint_id);

    // The executor applies the change and hands the new state back.
    let mut changed = initial.clone();
    changed.splice("objectives/weights/alpha", json!(0.9));
    kernel.checkpoint(&changed, Some("post-commit".into()), "executor")?;
    kernel.report(ExecutorReport {
        intent_id: IntentId::new("intent-shift-weights"),
        outcome: ReportOutcome::Committed {
            external_side_effect: false,
        },
    })?;
    println!("  Committed, new digest {}", &changed.digest()[..16]);

    let restored = kernel.rollback(&ticket.checkpoint_id, "operator-jane")?;
    println!(
        "  Rolled back, digest {} (matches seed: {})",
        &restored.digest()[..16],
        restored.digest() == initial.digest()
    );
    println!(
        "  intent-shift-weights phase: {:?}",
        kernel.phase(&IntentId::new("intent-shift-weights"))
    );
    println!();

    // ── An irreversible commit refuses to roll back ───────────────────────────

    kernel.submit(make_intent(
        "intent-notify-partner",
        "objectives/mode",
        10,
        "throughput",
        json!({ "mode": "surge" }),
    ))?;
    kernel.validate_intent(
        &IntentId::new("intent-notify-partner"),
        &ValidationContext::at(Utc::now()),
    )?;
    let ticket2 = kernel.release(&IntentId::new("intent-notify-partner"))?;
    kernel.report(ExecutorReport {
        intent_id: IntentId::new("intent-notify-partner"),
        outcome: ReportOutcome::Committed {
            external_side_effect: true,
        },
    })?;

    match kernel.rollback(&ticket2.checkpoint_id, "operator-jane") {
        Err(CustosError::IrreversibleSideEffect { intent_id }) => {
            println!(
                "  Rollback past '{}' refused: committed with an external side effect",
                intent_id
            );
        }
        Ok(_) => println!("  Unexpected: rollback succeeded"),
        Err(e) => return Err(e),
    }
    println!();

    println!(
        "  Audit records written: {} (chain intact: {})",
        ledger.len(),
        ledger.verify_chain(0, ledger.len().saturating_sub(1)).is_intact()
    );
    println!();
    Ok(())
}
