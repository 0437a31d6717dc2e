//! Scenario 4: escalation deadline expiry.
//!
//! The same priority tie as scenario 2, but nobody answers. The gateway is
//! configured with a zero timeout, so awaiting the verdict applies the
//! default outcome immediately: Reject for every suspended intent, with the
//! timeout on the audit trail. Inaction never approves anything.

use chrono::{Duration, Utc};
use serde_json::json;

use custos_audit::AuditSink;
use custos_contracts::{
    audit::AuditAction,
    conflict::Resolution,
    error::CustosResult,
    escalation::EscalationDefault,
    intent::IntentId,
    validation::ValidationContext,
};
use custos_core::KernelConfig;

use super::{build_kernel, make_intent};

pub fn run_scenario() -> CustosResult<()> {
    println!("=== Scenario 4: escalation timeout ===");
    println!();

    let (kernel, ledger) = build_kernel(KernelConfig {
        escalation_timeout: Duration::zero(),
        escalation_default: EscalationDefault::Reject,
        ..KernelConfig::default()
    })?;

    println!("  Same tie as scenario 2, zero deadline, nobody listening.");
    println!();

    kernel.submit(make_intent(
        "intent-raise-alpha",
        "objectives/weights/*",
        30,
        "stability",
        json!({ "alpha": 0.7 }),
    ))?;
    kernel.submit(make_intent(
        "intent-raise-beta",
        "objectives/weights/*",
        30,
        "stability",
        json!({ "beta": 0.7 }),
    ))?;
    kernel.validate_all_pending(&ValidationContext::at(Utc::now()))?;

    let conflicts = kernel.reconcile()?;
    let escalation_id = match conflicts.first().and_then(|c| c.resolution.as_ref()) {
        Some(Resolution::Escalated { escalation_id }) => *escalation_id,
        other => {
            println!("  Unexpected resolution: {:?}", other);
            return Ok(());
        }
    };

    let escalation = kernel.await_escalation(&escalation_id)?;
    println!("  Escalation {} state: {:?}", escalation_id, escalation.state);
    println!(
        "  intent-raise-alpha phase: {:?}",
        kernel.phase(&IntentId::new("intent-raise-alpha"))
    );
    println!(
        "  intent-raise-beta  phase: {:?}",
        kernel.phase(&IntentId::new("intent-raise-beta"))
    );

    let timed_out = ledger
        .records()
        .iter()
        .any(|r| r.action == AuditAction::EscalationTimedOut);
    println!("  EscalationTimedOut on the audit trail: {}", timed_out);
    println!();

    println!(
        "  Audit records written: {} (chain intact: {})",
        ledger.len(),
        ledger.verify_chain(0, ledger.len().saturating_sub(1)).is_intact()
    );
    println!();
    Ok(())
}
