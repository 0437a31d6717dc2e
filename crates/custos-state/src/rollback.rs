//! The checkpoint store and rollback controller.
//!
//! Checkpoints are immutable snapshots of the governed state, forming a DAG
//! keyed by `parent`; the store maintains exactly one current pointer,
//! swapped atomically inside the same critical section that records the
//! checkpoint. Rollback restores the target's exact serialized state after
//! verifying its digest, and refuses outright when a commit bracketed after
//! the target carries an external side effect the core cannot un-execute.
//!
//! Every checkpoint, rollback, partial rollback, and commit report writes
//! one audit record through the shared `AuditSink`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use custos_audit::AuditSink;
use custos_contracts::{
    audit::{AuditAction, DraftRecord},
    checkpoint::{Checkpoint, CheckpointId},
    error::{CustosError, CustosResult},
    intent::{ExecutorReport, IntentId, ReleaseTicket},
};

use crate::state::GovernedState;

/// How many checkpoints the store retains before pruning the oldest.
///
/// The current pointer's ancestry is never pruned, so the effective count can
/// exceed the cap while a long lineage is live.
pub const DEFAULT_MAX_CHECKPOINTS: usize = 64;

/// A checkpoint plus the serialized state it snapshots.
pub(crate) struct StoredCheckpoint {
    pub(crate) meta: Checkpoint,
    pub(crate) blob: Vec<u8>,
}

/// One executor report, indexed by the checkpoint that bracketed the release.
pub(crate) struct CommitEntry {
    pub(crate) checkpoint_id: CheckpointId,
    pub(crate) intent_id: IntentId,
    pub(crate) external_side_effect: bool,
}

pub(crate) struct StoreInner {
    pub(crate) checkpoints: BTreeMap<CheckpointId, StoredCheckpoint>,
    /// Creation order, oldest first. Drives pruning.
    pub(crate) order: Vec<CheckpointId>,
    pub(crate) current: Option<CheckpointId>,
    pub(crate) commits: Vec<CommitEntry>,
}

/// The result of a successful rollback.
pub struct RollbackOutcome {
    /// The restored governed state.
    pub state: GovernedState,
    /// Intents whose bracketed commits were undone by the restoration.
    pub undone_intents: Vec<IntentId>,
}

/// The rollback controller: checkpoint creation, restoration, and the
/// irreversibility check.
pub struct RollbackController {
    pub(crate) inner: Mutex<StoreInner>,
    ledger: Arc<dyn AuditSink>,
    max_checkpoints: usize,
}

impl RollbackController {
    pub fn new(ledger: Arc<dyn AuditSink>) -> Self {
        Self::with_capacity(ledger, DEFAULT_MAX_CHECKPOINTS)
    }

    pub fn with_capacity(ledger: Arc<dyn AuditSink>, max_checkpoints: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                checkpoints: BTreeMap::new(),
                order: Vec::new(),
                current: None,
                commits: Vec::new(),
            }),
            ledger,
            max_checkpoints: max_checkpoints.max(1),
        }
    }

    /// The checkpoint the store currently points at.
    pub fn current(&self) -> Option<CheckpointId> {
        self.inner.lock().expect("checkpoint store lock poisoned").current
    }

    /// Metadata for a stored checkpoint.
    pub fn checkpoint_meta(&self, id: &CheckpointId) -> Option<Checkpoint> {
        self.inner
            .lock()
            .expect("checkpoint store lock poisoned")
            .checkpoints
            .get(id)
            .map(|c| c.meta.clone())
    }

    /// The governed state as of the current checkpoint.
    pub fn current_state(&self) -> CustosResult<GovernedState> {
        let inner = self.inner.lock().expect("checkpoint store lock poisoned");
        match inner.current {
            None => Ok(GovernedState::empty()),
            Some(id) => decode_blob(&inner, &id),
        }
    }

    /// Snapshot `state` as a new checkpoint and swap the current pointer.
    pub fn checkpoint(
        &self,
        state: &GovernedState,
        label: Option<String>,
        actor: &str,
    ) -> CustosResult<CheckpointId> {
        let blob = serde_json::to_vec(state.as_value()).map_err(|e| {
            CustosError::ConfigError {
                reason: format!("failed to serialize governed state: {}", e),
            }
        })?;

        let mut inner = self.inner.lock().expect("checkpoint store lock poisoned");
        let meta = Checkpoint {
            id: CheckpointId::new(),
            created_at: Utc::now(),
            label,
            parent: inner.current,
            state_digest: state.digest(),
            created_by: actor.to_string(),
        };
        let id = meta.id;

        self.ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::CheckpointCreated,
            payload_ref: id.to_string(),
            timestamp: meta.created_at,
        })?;

        debug!(checkpoint_id = %id, digest = %meta.state_digest, "checkpoint created");
        inner.checkpoints.insert(id, StoredCheckpoint { meta, blob });
        inner.order.push(id);
        inner.current = Some(id);
        prune(&mut inner, self.max_checkpoints);
        Ok(id)
    }

    /// Store the executor's report against the checkpoint that bracketed the
    /// release. Required for the side-effect check on later rollbacks.
    pub fn record_commit(
        &self,
        ticket: &ReleaseTicket,
        report: &ExecutorReport,
    ) -> CustosResult<()> {
        let mut inner = self.inner.lock().expect("checkpoint store lock poisoned");
        if !inner.checkpoints.contains_key(&ticket.checkpoint_id) {
            return Err(CustosError::UnknownCheckpoint {
                checkpoint_id: ticket.checkpoint_id.to_string(),
            });
        }

        self.ledger.append(DraftRecord {
            actor: "executor".to_string(),
            action: AuditAction::CommitRecorded,
            payload_ref: format!("{}@{}", report.intent_id, ticket.checkpoint_id),
            timestamp: Utc::now(),
        })?;

        inner.commits.push(CommitEntry {
            checkpoint_id: ticket.checkpoint_id,
            intent_id: report.intent_id.clone(),
            external_side_effect: report.outcome.external_side_effect(),
        });
        Ok(())
    }

    /// Restore the exact state captured by `checkpoint_id` and repoint
    /// current at it.
    ///
    /// Refused with `IrreversibleSideEffect` if any commit bracketed at or
    /// after the target carries an external side effect — the governed state
    /// is left untouched and the discrepancy is reported to the caller.
    pub fn rollback(
        &self,
        checkpoint_id: &CheckpointId,
        actor: &str,
    ) -> CustosResult<RollbackOutcome> {
        let mut inner = self.inner.lock().expect("checkpoint store lock poisoned");
        if !inner.checkpoints.contains_key(checkpoint_id) {
            return Err(CustosError::UnknownCheckpoint {
                checkpoint_id: checkpoint_id.to_string(),
            });
        }

        let undone = commits_in_window(&inner, checkpoint_id);
        if let Some(blocker) = undone
            .iter()
            .find(|c| c.external_side_effect)
            .map(|c| c.intent_id.clone())
        {
            warn!(
                checkpoint_id = %checkpoint_id,
                intent_id = %blocker,
                "rollback refused: committed external side effect in window"
            );
            return Err(CustosError::IrreversibleSideEffect {
                intent_id: blocker.0,
            });
        }

        let restored = decode_blob(&inner, checkpoint_id)?;

        self.ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::RollbackApplied,
            payload_ref: checkpoint_id.to_string(),
            timestamp: Utc::now(),
        })?;

        info!(checkpoint_id = %checkpoint_id, actor, "rollback applied");
        inner.current = Some(*checkpoint_id);
        Ok(RollbackOutcome {
            state: restored,
            undone_intents: undone.into_iter().map(|c| c.intent_id).collect(),
        })
    }

    /// Splice one sub-tree from `checkpoint_id` into the current state,
    /// leaving unrelated later changes intact, and checkpoint the result.
    ///
    /// Returns the spliced state; the fresh checkpoint becomes current.
    pub fn rollback_field(
        &self,
        checkpoint_id: &CheckpointId,
        path: &str,
        actor: &str,
    ) -> CustosResult<GovernedState> {
        let mut inner = self.inner.lock().expect("checkpoint store lock poisoned");
        if !inner.checkpoints.contains_key(checkpoint_id) {
            return Err(CustosError::UnknownCheckpoint {
                checkpoint_id: checkpoint_id.to_string(),
            });
        }

        let source = decode_blob(&inner, checkpoint_id)?;
        let subtree = source
            .subtree(path)
            .ok_or_else(|| CustosError::UnknownStatePath {
                checkpoint_id: checkpoint_id.to_string(),
                path: path.to_string(),
            })?
            .clone();

        let mut spliced = match inner.current {
            None => GovernedState::empty(),
            Some(id) => decode_blob(&inner, &id)?,
        };
        spliced.splice(path, subtree);

        let blob = serde_json::to_vec(spliced.as_value()).map_err(|e| {
            CustosError::ConfigError {
                reason: format!("failed to serialize governed state: {}", e),
            }
        })?;
        let meta = Checkpoint {
            id: CheckpointId::new(),
            created_at: Utc::now(),
            label: Some(format!("partial-rollback:{}", path)),
            parent: inner.current,
            state_digest: spliced.digest(),
            created_by: actor.to_string(),
        };
        let fresh = meta.id;

        self.ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::PartialRollbackApplied,
            payload_ref: format!("{}#{}", checkpoint_id, path),
            timestamp: meta.created_at,
        })?;

        info!(
            checkpoint_id = %checkpoint_id,
            path,
            fresh_checkpoint = %fresh,
            "partial rollback applied"
        );
        inner.checkpoints.insert(fresh, StoredCheckpoint { meta, blob });
        inner.order.push(fresh);
        inner.current = Some(fresh);
        prune(&mut inner, self.max_checkpoints);
        Ok(spliced)
    }
}

/// Decode a stored blob, verifying it still matches its recorded digest.
fn decode_blob(inner: &StoreInner, id: &CheckpointId) -> CustosResult<GovernedState> {
    let stored = inner
        .checkpoints
        .get(id)
        .ok_or_else(|| CustosError::UnknownCheckpoint {
            checkpoint_id: id.to_string(),
        })?;
    let value: serde_json::Value =
        serde_json::from_slice(&stored.blob).map_err(|_| CustosError::CheckpointCorrupt {
            checkpoint_id: id.to_string(),
        })?;
    let state = GovernedState::new(value);
    if state.digest() != stored.meta.state_digest {
        return Err(CustosError::CheckpointCorrupt {
            checkpoint_id: id.to_string(),
        });
    }
    Ok(state)
}

/// The commits a rollback to `target` would undo: every commit bracketed at
/// a checkpoint from the target (inclusive) up to the current pointer.
///
/// A commit bracketed at a checkpoint happened after that checkpoint was
/// taken, so commits at the target itself are undone by the rollback too.
/// If the target is off the current ancestry the whole commit history is
/// in the window.
fn commits_in_window(inner: &StoreInner, target: &CheckpointId) -> Vec<CommitEntry> {
    let mut window: Vec<CheckpointId> = Vec::new();
    let mut cursor = inner.current;
    let mut found = false;
    while let Some(id) = cursor {
        window.push(id);
        if id == *target {
            found = true;
            break;
        }
        cursor = inner.checkpoints.get(&id).and_then(|c| c.meta.parent);
    }

    inner
        .commits
        .iter()
        .filter(|c| !found || window.contains(&c.checkpoint_id))
        .map(|c| CommitEntry {
            checkpoint_id: c.checkpoint_id,
            intent_id: c.intent_id.clone(),
            external_side_effect: c.external_side_effect,
        })
        .collect()
}

/// Drop the oldest checkpoints above the retention cap, skipping any that
/// sit on the current pointer's ancestry.
fn prune(inner: &mut StoreInner, max: usize) {
    if inner.checkpoints.len() <= max {
        return;
    }

    let mut protected = Vec::new();
    let mut cursor = inner.current;
    while let Some(id) = cursor {
        protected.push(id);
        cursor = inner.checkpoints.get(&id).and_then(|c| c.meta.parent);
    }

    let mut idx = 0;
    while inner.checkpoints.len() > max && idx < inner.order.len() {
        let candidate = inner.order[idx];
        if protected.contains(&candidate) {
            idx += 1;
            continue;
        }
        inner.order.remove(idx);
        inner.checkpoints.remove(&candidate);
        debug!(checkpoint_id = %candidate, "checkpoint pruned");
    }
}
