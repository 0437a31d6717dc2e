//! Conflict detection and the priority lattice.
//!
//! Detection groups approved intents whose scopes overlap into connected
//! components; each component of two or more intents is one n-ary conflict,
//! resolved atomically. Resolution compares effective priorities — the
//! originator's claim capped by the canon objective's lineage cap — and
//! either a strict unique maximum wins or the whole component escalates.
//! Ties are never broken silently.

use chrono::Utc;
use tracing::debug;

use custos_canon::ConstraintSnapshot;
use custos_contracts::{
    conflict::{Conflict, ConflictId},
    intent::{AccessMode, Intent, IntentId},
};

/// The lattice rule recorded on every automatically resolved conflict.
pub const PRIORITY_ORDERING_RULE: &str = "priority-ordering";

/// What the resolver concluded for one conflict component.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// A strict unique maximum of effective priority.
    Winner {
        winner: IntentId,
        losers: Vec<IntentId>,
    },
    /// Two or more intents share the top effective priority.
    Tie { contenders: Vec<IntentId> },
}

/// Group intents into scope-overlap conflict components.
///
/// Components of size one are not conflicts; the returned list is ordered by
/// the first intent id in each component, so equal inputs yield equal output.
pub fn detect(pending: &[Intent]) -> Vec<Conflict> {
    let n = pending.len();
    let mut parent: Vec<usize> = (0..n).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            if contend(&pending[i], &pending[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut components: Vec<Vec<IntentId>> = vec![Vec::new(); n];
    for i in 0..n {
        let root = find(&mut parent, i);
        components[root].push(pending[i].id.clone());
    }

    let mut conflicts: Vec<Conflict> = components
        .into_iter()
        .filter(|ids| ids.len() >= 2)
        .map(|mut intent_ids| {
            intent_ids.sort();
            Conflict {
                id: ConflictId::new(),
                intent_ids,
                detected_at: Utc::now(),
                resolution: None,
            }
        })
        .collect();
    conflicts.sort_by(|a, b| a.intent_ids.cmp(&b.intent_ids));

    debug!(
        intents = n,
        conflicts = conflicts.len(),
        "conflict detection pass complete"
    );
    conflicts
}

/// Resolve one conflict component by effective priority.
///
/// `participants` must be the intents named by the conflict. Order among
/// losers is by id.
pub fn resolve(participants: &[&Intent], snap: &ConstraintSnapshot) -> ResolveOutcome {
    let mut ranked: Vec<(i64, &Intent)> = participants
        .iter()
        .map(|intent| (effective_priority(intent, snap), *intent))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));

    let top = ranked.first().map(|(p, _)| *p).unwrap_or(0);
    let contenders: Vec<IntentId> = ranked
        .iter()
        .take_while(|(p, _)| *p == top)
        .map(|(_, intent)| intent.id.clone())
        .collect();

    if contenders.len() == 1 {
        let winner = contenders[0].clone();
        let mut losers: Vec<IntentId> = ranked
            .iter()
            .map(|(_, intent)| intent.id.clone())
            .filter(|id| *id != winner)
            .collect();
        losers.sort();
        ResolveOutcome::Winner { winner, losers }
    } else {
        ResolveOutcome::Tie { contenders }
    }
}

/// The priority a conflict actually compares: the originator's claim capped
/// by the canon objective's lineage cap. An intent cannot outrank its own
/// lineage; an intent with no declared objective keeps its claim.
pub fn effective_priority(intent: &Intent, snap: &ConstraintSnapshot) -> i64 {
    match &intent.objective {
        Some(objective_id) => snap
            .effective_priority_cap(objective_id)
            .map(|cap| intent.priority.min(cap))
            .unwrap_or(intent.priority),
        None => intent.priority,
    }
}

/// True if two approved intents actually contend.
///
/// Overlapping scopes contend, except when one side only reads a strictly
/// wider subtree than the other touches — a broad observer does not block a
/// narrow writer.
fn contend(a: &Intent, b: &Intent) -> bool {
    if !a.payload.scope.overlaps(&b.payload.scope) {
        return false;
    }
    if a.payload.scope.is_strict_parent_of(&b.payload.scope)
        && a.payload.mode == AccessMode::Read
    {
        return false;
    }
    if b.payload.scope.is_strict_parent_of(&a.payload.scope)
        && b.payload.mode == AccessMode::Read
    {
        return false;
    }
    true
}

/// Union-find with path halving.
fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

// ── Tests ─────────────────────────────────────────────────────────────────────
