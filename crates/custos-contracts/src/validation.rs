//! Validation results and the reasoning chain.
//!
//! Validation never mutates an intent: it produces a permanently retained
//! `ValidationResult` listing every check performed, pass or fail. A
//! rejection without a reasoning chain is a contract violation — every
//! decision must be explainable on demand.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::axiom::{AxiomId, Enforcement};
use crate::intent::IntentId;

/// Everything the validator may read besides the intent and the constraint
/// snapshot.
///
/// Carries the evaluation instant explicitly: `validate` is a pure function
/// of `(intent, context, snapshot)`, so the wall clock is never consulted —
/// repeated calls with the same context are bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    /// The instant this evaluation is considered to happen at.
    pub now: DateTime<Utc>,
    /// Boolean world-state observations supplied by the observation layer.
    pub flags: BTreeMap<String, bool>,
}

impl ValidationContext {
    /// A context pinned at the given instant with no flags set.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now, flags: BTreeMap::new() }
    }
}

/// The validator's decision for one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// No violations. Eligible for conflict reconciliation and release.
    Approved,
    /// At least one hard violation, or the intent was malformed. Terminal.
    Rejected,
    /// Soft violations only: recorded, surfaced, and the originator is asked
    /// to revise. Not released.
    NeedsModification,
}

/// One violated axiom or canon constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// The violated axiom, or a synthetic id for canon checks
    /// (e.g. `canon/priority-cap`).
    pub axiom_id: AxiomId,
    pub priority: i64,
    pub enforcement: Enforcement,
    pub description: String,
}

/// How a single check concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckOutcome {
    Passed,
    Failed,
    /// Noted without affecting the decision (soft violations, permissions,
    /// informational steps).
    Recorded,
}

/// One entry in the reasoning chain. Appending one per check is mandatory,
/// not optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 1-based position in the chain.
    pub step_number: u32,
    /// What was checked (e.g. `intake/well-formed`, `axiom/no_harm`,
    /// `canon/priority-cap`).
    pub check: String,
    pub outcome: CheckOutcome,
    /// Human-readable conclusion for this step.
    pub note: String,
}

/// The permanently retained record of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub intent_id: IntentId,
    pub decision: Decision,
    /// Violations ordered by priority descending.
    pub violated_axioms: Vec<Violation>,
    /// Every check performed, in evaluation order. Non-empty for every
    /// decision, including approvals.
    pub reasoning_chain: Vec<ReasoningStep>,
    /// Copied from `ValidationContext::now`, never the wall clock.
    pub evaluated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// True if any listed violation is hard.
    pub fn has_hard_violation(&self) -> bool {
        self.violated_axioms
            .iter()
            .any(|v| v.enforcement == Enforcement::Hard)
    }
}
