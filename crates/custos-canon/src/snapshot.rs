//! Immutable constraint snapshots.
//!
//! A snapshot is the pinned view of the axiom set and objective forest that
//! a batch of validations reads. Appends to the store build a new snapshot
//! and swap it in; outstanding snapshots are untouched, so concurrent axiom
//! appends never produce inconsistent per-intent decisions.

use std::collections::{BTreeMap, BTreeSet};

use custos_contracts::{
    axiom::{Axiom, AxiomId},
    canon::{CanonObjective, ObjectiveId},
    scope::ScopePattern,
};

/// A frozen view of the full constraint set.
///
/// Built by the store at load time and after every append. All lookups are
/// read-only; cloning the surrounding `Arc` is the only sharing mechanism.
#[derive(Debug, Clone)]
pub struct ConstraintSnapshot {
    /// Registered first segments for intent scopes. An intent whose scope
    /// root is not listed here is malformed.
    pub(crate) scope_roots: BTreeSet<String>,
    /// Explicit ordering for objectives that share a priority. Ties not
    /// covered here are rejected at load.
    pub(crate) tie_break: Vec<ObjectiveId>,
    /// All versions of every axiom family, ascending by version. Old
    /// versions are retained for audit; evaluation uses the newest.
    pub(crate) axioms: BTreeMap<AxiomId, Vec<Axiom>>,
    pub(crate) objectives: BTreeMap<ObjectiveId, CanonObjective>,
}

impl ConstraintSnapshot {
    /// True if the given scope root segment is registered.
    pub fn is_known_root(&self, root: &str) -> bool {
        self.scope_roots.contains(root)
    }

    /// The newest version of the named axiom family.
    pub fn latest_axiom(&self, id: &AxiomId) -> Option<&Axiom> {
        self.axioms.get(id).and_then(|versions| versions.last())
    }

    /// Every retained version of the named axiom family, oldest first.
    pub fn axiom_versions(&self, id: &AxiomId) -> &[Axiom] {
        self.axioms.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The axioms whose scope overlaps the given scope, newest version of
    /// each family only, ordered for evaluation: priority descending, hard
    /// enforcement before soft at equal priority, id as the final tie-break
    /// so the ordering is total and deterministic.
    pub fn axioms_for(&self, scope: &ScopePattern) -> Vec<&Axiom> {
        let mut matched: Vec<&Axiom> = self
            .axioms
            .values()
            .filter_map(|versions| versions.last())
            .filter(|axiom| axiom.scope.overlaps(scope))
            .collect();

        matched.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.enforcement.cmp(&b.enforcement))
                .then(a.id.cmp(&b.id))
        });
        matched
    }

    pub fn objective(&self, id: &ObjectiveId) -> Option<&CanonObjective> {
        self.objectives.get(id)
    }

    pub fn objectives(&self) -> impl Iterator<Item = &CanonObjective> {
        self.objectives.values()
    }

    /// The effective priority cap of an objective: the minimum priority
    /// along its ancestor chain, itself included. An intent serving this
    /// objective can never claim a higher priority than this cap — priority
    /// cannot be laundered through lineage.
    ///
    /// Returns `None` for an unknown objective. The forest is cycle-free at
    /// load, so the walk terminates.
    pub fn effective_priority_cap(&self, id: &ObjectiveId) -> Option<i64> {
        let mut current = self.objectives.get(id)?;
        let mut cap = current.priority;
        while let Some(parent_id) = &current.parent {
            match self.objectives.get(parent_id) {
                Some(parent) => {
                    cap = cap.min(parent.priority);
                    current = parent;
                }
                None => break,
            }
        }
        Some(cap)
    }

    /// Total order over two objectives: by priority descending, falling back
    /// to the explicit tie-break list position for equal priorities.
    ///
    /// Load-time validation guarantees every tie is covered by `tie_break`,
    /// so the ordering is total.
    pub fn rank_objectives(&self, a: &ObjectiveId, b: &ObjectiveId) -> std::cmp::Ordering {
        let pa = self.objectives.get(a).map(|o| o.priority);
        let pb = self.objectives.get(b).map(|o| o.priority);
        pb.cmp(&pa).then_with(|| {
            let ia = self.tie_break.iter().position(|id| id == a);
            let ib = self.tie_break.iter().position(|id| id == b);
            ia.cmp(&ib)
        })
    }
}
