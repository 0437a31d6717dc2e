//! Scenario 1: the no_harm prohibition.
//!
//! A planner intent tries to carry `action = "disable_safety"` in its
//! parameters. The hard `no_harm` axiom (priority 100) rejects it, and the
//! retained reasoning chain shows every check that ran — including the ones
//! that passed.

use chrono::Utc;
use serde_json::json;

use custos_audit::AuditSink;
use custos_contracts::{
    error::CustosResult,
    intent::IntentId,
    validation::{Decision, ValidationContext},
};
use custos_core::KernelConfig;

use super::{build_kernel, make_intent};

pub fn run_scenario() -> CustosResult<()> {
    println!("=== Scenario 1: no_harm rejection ===");
    println!();

    let (kernel, ledger) = build_kernel(KernelConfig::default())?;

    println!("  Intent: adjust_weights on objectives/weights/alpha");
    println!("  Params: {{ \"action\": \"disable_safety\" }}");
    println!("  Axiom:  no_harm (hard, priority 100) prohibits that parameter");
    println!();

    let intent = make_intent(
        "intent-disable-safety",
        "objectives/weights/alpha",
        10,
        "throughput",
        json!({ "action": "disable_safety" }),
    );
    kernel.submit(intent)?;

    let result = kernel.validate_intent(
        &IntentId::new("intent-disable-safety"),
        &ValidationContext::at(Utc::now()),
    )?;

    println!("  Decision: {:?}", result.decision);
    assert_eq!(result.decision, Decision::Rejected);

    println!("  Reasoning chain:");
    for step in &result.reasoning_chain {
        println!(
            "    [{}] {:<24} {:?}: {}",
            step.step_number, step.check, step.outcome, step.note
        );
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
