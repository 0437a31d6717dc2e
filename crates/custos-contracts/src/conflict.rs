//! Conflicts between simultaneously approved intents.
//!
//! Detection groups approved-pending intents whose scopes overlap into
//! connected components; a whole component is resolved atomically — either a
//! strict-priority winner emerges or the entire component escalates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::escalation::EscalationId;
use crate::intent::IntentId;

/// Identifier for a detected conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictId(pub Uuid);

impl ConflictId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

/// A detected n-ary interaction between approved intents with overlapping
/// scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    /// All intents in the scope-overlap connected component, sorted by id
    /// for determinism.
    pub intent_ids: Vec<IntentId>,
    pub detected_at: DateTime<Utc>,
    /// Filled in by the resolver; `None` while undetermined.
    pub resolution: Option<Resolution>,
}

/// How a conflict was settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Resolution {
    /// A strict priority winner was found; every other intent in the
    /// component was demoted to Rejected.
    Resolved {
        winner: IntentId,
        /// The lattice rule that produced the decision
        /// (e.g. "priority-ordering").
        rule_applied: String,
    },
    /// Effective priorities tied at the top; the component is suspended
    /// pending human input. Ties are never broken silently.
    Escalated { escalation_id: EscalationId },
}
