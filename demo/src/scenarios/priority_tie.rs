//! Scenario 2: an exact priority tie escalates.
//!
//! Two approved intents want the same scope at the same effective priority.
//! The resolver refuses to break the tie automatically: the whole component
//! escalates with a deadline, and a human verdict — delivered through the
//! authority channel and audited under the human's identity — settles it.

use chrono::Utc;
use serde_json::json;

use custos_audit::AuditSink;
use custos_contracts::{
    conflict::Resolution,
    error::CustosResult,
    escalation::EscalationVerdict,
    intent::IntentId,
    validation::ValidationContext,
};
use custos_core::KernelConfig;

use super::{build_kernel, make_intent};

pub fn run_scenario() -> CustosResult<()> {
    println!("=== Scenario 2: priority-tie escalation ===");
    println!();

    let (kernel, ledger) = build_kernel(KernelConfig::default())?;

    println!("  Two writers claim objectives/weights/* at effective priority 30.");
    println!("  Ties are never broken silently: the component escalates.");
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

    println!("  Escalation raised: {}", escalation_id);
    println!(
        "  intent-raise-alpha phase: {:?}",
        kernel.phase(&IntentId::new("intent-raise-alpha"))
    );
    println!(
        "  intent-raise-beta  phase: {:?}",
        kernel.phase(&IntentId::new("intent-raise-beta"))
    );
    println!();

    println!("  Human verdict: approve intent-raise-beta (operator-jane)");
    let decided = kernel.gateway().resolve_escalation(
        &escalation_id,
        EscalationVerdict::Approve {
            intent_id: IntentId::new("intent-raise-beta"),
        },
        "operator-jane",
    )?;
    kernel.apply_escalation(&decided)?;

    println!(
        "  intent-raise-alpha phase: {:?}",
        kernel.phase(&IntentId::new("intent-raise-alpha"))
    );
    println!(
        "  intent-raise-beta  phase: {:?}",
        kernel.phase(&IntentId::new("intent-raise-beta"))
    );
    println!();

    println!(
        "  Audit records written: {} (chain intact: {})",
        ledger.len(),
        ledger.verify_chain(0, ledger.len().saturating_sub(1)).is_intact()
    );
    println!();
    Ok(())
}
