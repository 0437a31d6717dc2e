//! The intent validator: the primary governance gate.
//!
//! Evaluation pipeline per intent:
//!
//!   intake check → matched axioms in priority order → canon lineage checks
//!   → decision
//!
//! Every step, pass or fail, appends one entry to the reasoning chain —
//! mandatory, because every decision must be explainable on demand. A hard
//! violation rejects, but evaluation does not stop early: the chain lists
//! every failed check, not just the first.
//!
//! `validate` is a pure function of `(intent, context, snapshot)`. The
//! evaluation instant comes from the context, never the wall clock, so
//! identical inputs yield a bit-identical `ValidationResult`.

use tracing::{debug, warn};

use custos_canon::ConstraintSnapshot;
use custos_contracts::{
    axiom::{Axiom, AxiomId, AxiomKind, Enforcement},
    intent::Intent,
    validation::{
        CheckOutcome, Decision, ReasoningStep, ValidationContext, ValidationResult, Violation,
    },
};

/// Validate one intent against a pinned constraint snapshot.
pub fn validate(
    intent: &Intent,
    ctx: &ValidationContext,
    snap: &ConstraintSnapshot,
) -> ValidationResult {
    let mut chain = ChainBuilder::new();

    // ── Intake: structural checks before any axiom is touched ────────────────
    if let Some(defect) = intake_defect(intent, snap) {
        warn!(intent_id = %intent.id, defect = %defect, "malformed intent rejected");
        chain.push("intake/well-formed", CheckOutcome::Failed, defect);
        return ValidationResult {
            intent_id: intent.id.clone(),
            decision: Decision::Rejected,
            violated_axioms: Vec::new(),
            reasoning_chain: chain.steps,
            evaluated_at: ctx.now,
        };
    }
    chain.push(
        "intake/well-formed",
        CheckOutcome::Passed,
        format!(
            "intent '{}' is structurally valid for scope '{}'",
            intent.id, intent.payload.scope
        ),
    );

    let mut violations: Vec<Violation> = Vec::new();

    // ── Axioms, priority-descending, hard before soft ────────────────────────
    for axiom in snap.axioms_for(&intent.payload.scope) {
        check_axiom(axiom, intent, ctx, &mut chain, &mut violations);
    }

    // ── Canon lineage ────────────────────────────────────────────────────────
    match &intent.objective {
        None => {
            chain.push(
                "canon/lineage",
                CheckOutcome::Recorded,
                "no objective lineage declared".to_string(),
            );
        }
        Some(objective_id) => match snap.effective_priority_cap(objective_id) {
            None => {
                chain.push(
                    "canon/unknown-objective",
                    CheckOutcome::Failed,
                    format!("declared objective '{}' does not exist in canon", objective_id),
                );
                violations.push(Violation {
                    axiom_id: AxiomId::new("canon/unknown-objective"),
                    priority: i64::MAX,
                    enforcement: Enforcement::Hard,
                    description: format!("unknown objective '{}'", objective_id),
                });
            }
            Some(cap) if intent.priority > cap => {
                chain.push(
                    "canon/priority-cap",
                    CheckOutcome::Failed,
                    format!(
                        "declared priority {} exceeds objective '{}' lineage cap {}",
                        intent.priority, objective_id, cap
                    ),
                );
                violations.push(Violation {
                    axiom_id: AxiomId::new("canon/priority-cap"),
                    priority: cap,
                    enforcement: Enforcement::Hard,
                    description: format!(
                        "intent priority {} exceeds lineage cap {}",
                        intent.priority, cap
                    ),
                });
            }
            Some(cap) => {
                chain.push(
                    "canon/priority-cap",
                    CheckOutcome::Passed,
                    format!(
                        "declared priority {} within objective '{}' cap {}",
                        intent.priority, objective_id, cap
                    ),
                );
            }
        },
    }

    // ── Decision ─────────────────────────────────────────────────────────────
    let has_hard = violations.iter().any(|v| v.enforcement == Enforcement::Hard);
    let decision = if has_hard {
        Decision::Rejected
    } else if violations.is_empty() {
        Decision::Approved
    } else {
        Decision::NeedsModification
    };

    // Violations ordered by priority descending, id as stable tie-break.
    violations.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.axiom_id.cmp(&b.axiom_id)));

    debug!(
        intent_id = %intent.id,
        decision = ?decision,
        violations = violations.len(),
        steps = chain.steps.len(),
        "intent validated"
    );

    ValidationResult {
        intent_id: intent.id.clone(),
        decision,
        violated_axioms: violations,
        reasoning_chain: chain.steps,
        evaluated_at: ctx.now,
    }
}

/// Returns the first structural defect, if any. Checked before any axiom is
/// evaluated so a malformed intent fails fast.
fn intake_defect(intent: &Intent, snap: &ConstraintSnapshot) -> Option<String> {
    if intent.payload.action.is_empty() {
        return Some("payload action is empty".to_string());
    }
    if !intent.payload.scope.is_well_formed() {
        return Some(format!("scope '{}' is malformed", intent.payload.scope));
    }
    match intent.payload.scope.root() {
        None => return Some("scope has no root segment".to_string()),
        Some(root) if !snap.is_known_root(root) => {
            return Some(format!("scope root '{}' is not registered", root));
        }
        Some(_) => {}
    }
    if intent.priority < 0 {
        return Some(format!("priority {} is negative", intent.priority));
    }
    None
}

/// Evaluate one axiom and record exactly one reasoning step for it.
fn check_axiom(
    axiom: &Axiom,
    intent: &Intent,
    ctx: &ValidationContext,
    chain: &mut ChainBuilder,
    violations: &mut Vec<Violation>,
) {
    let check = format!("axiom/{}", axiom.id.0);
    let holds = axiom.condition.evaluate(intent, ctx);

    let violated = match axiom.kind {
        // A prohibition is violated when its condition holds.
        AxiomKind::Prohibition => holds,
        // An obligation is violated when its condition does not hold.
        AxiomKind::Obligation => !holds,
        AxiomKind::Permission => {
            let note = if holds {
                format!("permission '{}' explicitly sanctions this intent", axiom.id.0)
            } else {
                format!("permission '{}' does not apply", axiom.id.0)
            };
            chain.push(&check, CheckOutcome::Recorded, note);
            return;
        }
    };

    if !violated {
        chain.push(
            &check,
            CheckOutcome::Passed,
            format!("{:?} '{}' satisfied", axiom.kind, axiom.id.0),
        );
        return;
    }

    let description = format!(
        "{:?} '{}' (priority {}, {:?}) violated over scope '{}'",
        axiom.kind, axiom.id.0, axiom.priority, axiom.enforcement, axiom.scope
    );
    match axiom.enforcement {
        Enforcement::Hard => {
            chain.push(&check, CheckOutcome::Failed, description.clone());
        }
        Enforcement::Soft => {
            // Recorded, surfaced, but never blocking on its own.
            chain.push(
                &check,
                CheckOutcome::Recorded,
                format!("{} — recorded, non-blocking", description),
            );
        }
    }
    violations.push(Violation {
        axiom_id: axiom.id.clone(),
        priority: axiom.priority,
        enforcement: axiom.enforcement,
        description,
    });
}

/// Accumulates reasoning steps with 1-based numbering.
struct ChainBuilder {
    steps: Vec<ReasoningStep>,
}

impl ChainBuilder {
    fn new() -> Self {
        Self { steps: Vec::new() }
    }

    fn push(&mut self, check: &str, outcome: CheckOutcome, note: String) {
        self.steps.push(ReasoningStep {
            step_number: self.steps.len() as u32 + 1,
            check: check.to_string(),
            outcome,
            note,
        });
    }
}
