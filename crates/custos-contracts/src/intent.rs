//! Intents: proposed units of change, and their lifecycle.
//!
//! An intent arrives already structured from the planning layer. It is
//! immutable once created — validation produces a separate `ValidationResult`
//! record and never touches the intent itself.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canon::ObjectiveId;
use crate::scope::ScopePattern;

/// Origin-assigned identifier for an intent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(pub String);

impl IntentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the intent reads or writes the scope it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    Read,
    Write,
}

/// The structured body of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPayload {
    /// The operation the originator wants performed (e.g. "adjust_weights").
    pub action: String,
    /// The part of the governed state the action touches.
    pub scope: ScopePattern,
    pub mode: AccessMode,
    /// Arbitrary JSON parameters. Axiom conditions address into this via
    /// dot-paths; the core never interprets it otherwise.
    pub params: Value,
}

/// A proposed unit of change, submitted for validation.
///
/// Immutable once created. `priority` is the originator's claim; during
/// conflict resolution it is capped by the priority of the canon objective
/// the intent traces to — an intent cannot outrank its own lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    /// The component that produced this intent (e.g. "planner").
    pub origin: String,
    pub timestamp: DateTime<Utc>,
    /// Larger value = higher priority.
    pub priority: i64,
    /// If set, escalations involving this intent apply their timeout default
    /// once this instant passes.
    pub deadline: Option<DateTime<Utc>>,
    /// The canon objective this intent serves, if declared.
    pub objective: Option<ObjectiveId>,
    pub payload: IntentPayload,
}

/// Lifecycle phase of an intent inside the kernel.
///
/// Pending → Validated(Approved | Rejected | NeedsModification) →
/// Released → Committed | RolledBack. `Blocked` covers intents suspended by
/// an open escalation; `Withdrawn` is reachable only from Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentPhase {
    /// Submitted, not yet validated.
    Pending,
    /// Validation approved; awaiting conflict reconciliation and release.
    Approved,
    /// Validation rejected, or demoted by a lost conflict or a superseding
    /// decision. Terminal.
    Rejected,
    /// Validation found soft violations only; the originator should revise.
    NeedsModification,
    /// Suspended by an open escalation.
    Blocked,
    /// Handed to the executor with its bracketing checkpoint.
    Released,
    /// The executor reported successful commitment.
    Committed,
    /// The executor reported failure after release.
    Failed,
    /// A rollback reverted this intent's committed change.
    RolledBack,
    /// Withdrawn by its origin while still Pending.
    Withdrawn,
}

impl fmt::Display for IntentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntentPhase::Pending => "pending",
            IntentPhase::Approved => "approved",
            IntentPhase::Rejected => "rejected",
            IntentPhase::NeedsModification => "needs-modification",
            IntentPhase::Blocked => "blocked",
            IntentPhase::Released => "released",
            IntentPhase::Committed => "committed",
            IntentPhase::Failed => "failed",
            IntentPhase::RolledBack => "rolled-back",
            IntentPhase::Withdrawn => "withdrawn",
        };
        f.write_str(name)
    }
}

/// The bundle handed to the executor when an approved intent is released.
///
/// The checkpoint was taken immediately before release, so every committed
/// change is checkpoint-bracketed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseTicket {
    pub intent_id: IntentId,
    pub checkpoint_id: crate::checkpoint::CheckpointId,
}

/// The executor's mandatory report for every released intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorReport {
    pub intent_id: IntentId,
    pub outcome: ReportOutcome,
}

/// What happened to a released intent outside the core.
///
/// `external_side_effect` marks changes this core cannot un-execute; the
/// rollback controller refuses to roll back past them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum ReportOutcome {
    Committed { external_side_effect: bool },
    Failed { reason: String, external_side_effect: bool },
}

impl ReportOutcome {
    pub fn external_side_effect(&self) -> bool {
        match self {
            ReportOutcome::Committed { external_side_effect }
            | ReportOutcome::Failed { external_side_effect, .. } => *external_side_effect,
        }
    }
}
