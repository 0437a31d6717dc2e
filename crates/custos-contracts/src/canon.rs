//! Canon objectives: the ranked, hierarchical objective set.
//!
//! Objectives form a forest (each may name a parent, no cycles) and carry
//! globally ordered priorities. An intent that declares an objective is
//! priority-capped by that objective's lineage during conflict resolution.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::axiom::AxiomId;

/// Stable identifier for a canon objective.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveId(pub String);

impl ObjectiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single canon objective.
///
/// Priorities are globally unique unless the constraint set declares an
/// explicit tie-break ordering covering the tied ids; the loader rejects
/// anything else at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonObjective {
    pub id: ObjectiveId,
    /// Larger value = higher rank.
    pub priority: i64,
    /// Parent objective, if this is a sub-objective.
    #[serde(default)]
    pub parent: Option<ObjectiveId>,
    /// Named numeric targets this objective tracks. A `BTreeMap` keeps the
    /// serialized form deterministic.
    #[serde(default)]
    pub metric_targets: BTreeMap<String, f64>,
    /// Axioms this objective is bound by. Every entry must resolve at load.
    #[serde(default)]
    pub axiom_refs: Vec<AxiomId>,
}
