//! # custos-state
//!
//! The checkpoint store and rollback controller: immutable snapshots of the
//! governed state, digest-verified restoration, partial (sub-tree) rollback,
//! and the irreversibility check that refuses to roll back past a commit
//! with an external side effect.

pub mod rollback;
pub mod state;

pub use rollback::{RollbackController, RollbackOutcome, DEFAULT_MAX_CHECKPOINTS};
pub use state::GovernedState;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use custos_audit::{AuditSink, MemoryLedger};
    use custos_contracts::{
        audit::AuditAction,
        checkpoint::CheckpointId,
        error::CustosError,
        intent::{ExecutorReport, IntentId, ReleaseTicket, ReportOutcome},
    };

    use super::{GovernedState, RollbackController};

    fn controller() -> (RollbackController, MemoryLedger) {
        let ledger = MemoryLedger::new();
        (RollbackController::new(Arc::new(ledger.clone())), ledger)
    }

    fn sample_state() -> GovernedState {
        GovernedState::new(json!({
            "objectives": {
                "weights": { "alpha": 0.5, "beta": 0.5 },
                "mode": "steady"
            },
            "infrastructure": { "replicas": 3 }
        }))
    }

    fn commit_report(intent: &str, external: bool) -> ExecutorReport {
        ExecutorReport {
            intent_id: IntentId::new(intent),
            outcome: ReportOutcome::Committed {
                external_side_effect: external,
            },
        }
    }

    // ── GovernedState ─────────────────────────────────────────────────────────

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = sample_state();
        let b = sample_state();
        assert_eq!(a.digest(), b.digest());

        let mut c = sample_state();
        c.splice("objectives/mode", json!("surge"));
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn subtree_addresses_slash_paths() {
        let state = sample_state();
        assert_eq!(
            state.subtree("objectives/weights/alpha"),
            Some(&json!(0.5))
        );
        assert!(state.subtree("objectives/missing").is_none());
        assert_eq!(state.subtree(""), Some(state.as_value()));
    }

    #[test]
    fn splice_creates_intermediate_objects() {
        let mut state = GovernedState::empty();
        state.splice("a/b/c", json!(1));
        assert_eq!(state.subtree("a/b/c"), Some(&json!(1)));
    }

    // ── Checkpoint and rollback ───────────────────────────────────────────────

    #[test]
    fn rollback_restores_exact_state() {
        let (ctl, _ledger) = controller();
        let before = sample_state();
        let cp = ctl.checkpoint(&before, Some("pre-change".into()), "kernel").unwrap();

        let mut mutated = before.clone();
        mutated.splice("objectives/weights/alpha", json!(0.9));
        ctl.checkpoint(&mutated, None, "kernel").unwrap();

        let outcome = ctl.rollback(&cp, "operator").unwrap();
        assert_eq!(outcome.state.digest(), before.digest());
        assert_eq!(ctl.current(), Some(cp));
    }

    #[test]
    fn rollback_to_unknown_checkpoint_fails() {
        let (ctl, _ledger) = controller();
        ctl.checkpoint(&sample_state(), None, "kernel").unwrap();

        let missing = CheckpointId::new();
        assert!(matches!(
            ctl.rollback(&missing, "operator"),
            Err(CustosError::UnknownCheckpoint { .. })
        ));
    }

    #[test]
    fn external_side_effect_blocks_rollback_and_leaves_state() {
        let (ctl, _ledger) = controller();
        let cp = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        let ticket = ReleaseTicket {
            intent_id: IntentId::new("intent-x"),
            checkpoint_id: cp,
        };
        ctl.record_commit(&ticket, &commit_report("intent-x", true)).unwrap();

        let mut after = sample_state();
        after.splice("objectives/mode", json!("surge"));
        let head = ctl.checkpoint(&after, None, "kernel").unwrap();

        match ctl.rollback(&cp, "operator") {
            Err(CustosError::IrreversibleSideEffect { intent_id }) => {
                assert_eq!(intent_id, "intent-x");
            }
            other => panic!("expected IrreversibleSideEffect, got {:?}", other.map(|_| ())),
        }
        // The pointer did not move.
        assert_eq!(ctl.current(), Some(head));
        assert_eq!(ctl.current_state().unwrap().digest(), after.digest());
    }

    #[test]
    fn reversible_commits_do_not_block_rollback() {
        let (ctl, _ledger) = controller();
        let cp = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        let ticket = ReleaseTicket {
            intent_id: IntentId::new("intent-y"),
            checkpoint_id: cp,
        };
        ctl.record_commit(&ticket, &commit_report("intent-y", false)).unwrap();

        let outcome = ctl.rollback(&cp, "operator").unwrap();
        assert_eq!(outcome.undone_intents, vec![IntentId::new("intent-y")]);
    }

    #[test]
    fn tampered_blob_is_detected_on_restore() {
        let (ctl, _ledger) = controller();
        let cp = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();

        {
            let mut inner = ctl.inner.lock().unwrap();
            let stored = inner.checkpoints.get_mut(&cp).unwrap();
            stored.blob = serde_json::to_vec(&json!({ "objectives": "forged" })).unwrap();
        }

        assert!(matches!(
            ctl.rollback(&cp, "operator"),
            Err(CustosError::CheckpointCorrupt { .. })
        ));
    }

    // ── Partial rollback ──────────────────────────────────────────────────────

    #[test]
    fn rollback_field_splices_only_the_named_subtree() {
        let (ctl, _ledger) = controller();
        let before = sample_state();
        let cp = ctl.checkpoint(&before, None, "kernel").unwrap();

        let mut later = before.clone();
        later.splice("objectives/weights/alpha", json!(0.9));
        later.splice("infrastructure/replicas", json!(7));
        ctl.checkpoint(&later, None, "kernel").unwrap();

        let spliced = ctl.rollback_field(&cp, "objectives/weights", "operator").unwrap();

        // The named sub-tree is back to its checkpointed value.
        assert_eq!(spliced.subtree("objectives/weights/alpha"), Some(&json!(0.5)));
        // Unrelated later changes are intact.
        assert_eq!(spliced.subtree("infrastructure/replicas"), Some(&json!(7)));
        // A fresh checkpoint of the spliced state became current.
        let fresh = ctl.current().unwrap();
        assert_ne!(fresh, cp);
        assert_eq!(ctl.current_state().unwrap().digest(), spliced.digest());
    }

    #[test]
    fn rollback_field_rejects_unknown_path() {
        let (ctl, _ledger) = controller();
        let cp = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();

        assert!(matches!(
            ctl.rollback_field(&cp, "objectives/nonexistent", "operator"),
            Err(CustosError::UnknownStatePath { .. })
        ));
    }

    // ── Retention ─────────────────────────────────────────────────────────────

    #[test]
    fn pruning_spares_the_current_ancestry() {
        let ledger = MemoryLedger::new();
        let ctl = RollbackController::with_capacity(Arc::new(ledger), 2);

        let cp1 = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        let cp2 = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        let cp3 = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        // cp1 ← cp2 ← cp3 is all live ancestry, so nothing is pruned yet.
        assert!(ctl.checkpoint_meta(&cp1).is_some());

        ctl.rollback(&cp1, "operator").unwrap();
        // Now only cp1 is protected; the next checkpoint evicts cp2 and cp3.
        let cp4 = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        assert!(ctl.checkpoint_meta(&cp2).is_none());
        assert!(ctl.checkpoint_meta(&cp3).is_none());
        assert!(ctl.checkpoint_meta(&cp1).is_some());
        assert!(ctl.checkpoint_meta(&cp4).is_some());
    }

    // ── Audit coupling ────────────────────────────────────────────────────────

    #[test]
    fn every_state_operation_is_audited() {
        let (ctl, ledger) = controller();
        let cp = ctl.checkpoint(&sample_state(), None, "kernel").unwrap();
        let ticket = ReleaseTicket {
            intent_id: IntentId::new("intent-z"),
            checkpoint_id: cp,
        };
        ctl.record_commit(&ticket, &commit_report("intent-z", false)).unwrap();
        ctl.rollback(&cp, "operator").unwrap();
        ctl.rollback_field(&cp, "objectives", "operator").unwrap();

        let actions: Vec<AuditAction> = ledger.records().iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::CheckpointCreated,
                AuditAction::CommitRecorded,
                AuditAction::RollbackApplied,
                AuditAction::PartialRollbackApplied,
            ]
        );
        assert!(ledger.verify_chain(0, ledger.len() - 1).is_intact());
    }
}
