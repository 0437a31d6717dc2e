//! # custos-validate
//!
//! Pure, deterministic validation of intents against a pinned constraint
//! snapshot. See `validator::validate` for the evaluation pipeline.

pub mod validator;

pub use validator::validate;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use custos_canon::ConstraintStore;
    use custos_contracts::{
        axiom::Enforcement,
        canon::ObjectiveId,
        intent::{AccessMode, Intent, IntentId, IntentPayload},
        scope::ScopePattern,
        validation::{CheckOutcome, Decision, ValidationContext},
    };

    use super::validate;

    // ── Fixture ───────────────────────────────────────────────────────────────

    const CANON: &str = r#"
        scope_roots = ["objectives", "safety"]

        [[axioms]]
        id = "no_harm"
        version = 1
        priority = 100
        kind = "prohibition"
        scope = "objectives/*"
        condition = { check = "param-equals", key = "action", value = "disable_safety" }
        enforcement = "hard"
        created_at = "2025-01-01T00:00:00Z"
        created_by = "governance-board"

        [[axioms]]
        id = "no_untrusted_writes"
        version = 1
        priority = 80
        kind = "prohibition"
        scope = "objectives/*"
        condition = { check = "all-of", conditions = [
            { check = "writes-state" },
            { check = "not", inner = { check = "origin-equals", value = "planner" } },
        ] }
        enforcement = "hard"
        created_at = "2025-01-01T00:00:00Z"
        created_by = "governance-board"

        [[axioms]]
        id = "declare_lineage"
        version = 1
        priority = 60
        kind = "obligation"
        scope = "objectives/*"
        condition = { check = "not", inner = { check = "context-flag", flag = "lineage-missing" } }
        enforcement = "soft"
        created_at = "2025-01-01T00:00:00Z"
        created_by = "governance-board"

        [[axioms]]
        id = "observation_sanctioned"
        version = 1
        priority = 10
        kind = "permission"
        scope = "objectives/*"
        condition = { check = "not", inner = { check = "writes-state" } }
        created_at = "2025-01-01T00:00:00Z"
        created_by = "governance-board"
        enforcement = "soft"

        [[objectives]]
        id = "stability"
        priority = 50

        [[objectives]]
        id = "throughput"
        priority = 30
        parent = "stability"
    "#;

    fn make_intent(id: &str, action: &str, params: serde_json::Value) -> Intent {
        Intent {
            id: IntentId::new(id),
            origin: "planner".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            priority: 10,
            deadline: None,
            objective: Some(ObjectiveId::new("throughput")),
            payload: IntentPayload {
                action: action.to_string(),
                scope: ScopePattern::new("objectives/weights/alpha"),
                mode: AccessMode::Write,
                params,
            },
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::at(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
    }

    // ── Scenario: the no_harm prohibition ─────────────────────────────────────

    /// An intent whose payload carries action = "disable_safety" is rejected
    /// and the reasoning chain names no_harm.
    #[test]
    fn no_harm_rejects_disable_safety() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let intent = make_intent(
            "intent-evil",
            "update",
            json!({ "action": "disable_safety" }),
        );

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Rejected);
        assert!(result
            .violated_axioms
            .iter()
            .any(|v| v.axiom_id.0 == "no_harm"));
        assert!(result
            .reasoning_chain
            .iter()
            .any(|s| s.check == "axiom/no_harm" && s.outcome == CheckOutcome::Failed));
    }

    /// A benign write from the planner is approved, with a non-empty chain
    /// listing every check performed.
    #[test]
    fn benign_intent_is_approved_with_full_chain() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let intent = make_intent("intent-ok", "adjust_weights", json!({ "delta": 0.1 }));

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Approved);
        assert!(result.violated_axioms.is_empty());
        // intake + 4 axioms + canon cap = 6 steps.
        assert_eq!(result.reasoning_chain.len(), 6);
        assert_eq!(result.reasoning_chain[0].check, "intake/well-formed");
        // Steps are numbered 1..=n.
        for (idx, step) in result.reasoning_chain.iter().enumerate() {
            assert_eq!(step.step_number as usize, idx + 1);
        }
    }

    // ── Determinism ───────────────────────────────────────────────────────────

    /// Repeated validation with identical inputs is bit-identical.
    #[test]
    fn validation_is_deterministic() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let snap = store.snapshot();
        let intent = make_intent(
            "intent-det",
            "update",
            json!({ "action": "disable_safety" }),
        );
        let context = ctx();

        let first = validate(&intent, &context, &snap);
        let second = validate(&intent, &context, &snap);

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap(),
            "identical inputs must yield a bit-identical ValidationResult"
        );
    }

    // ── Malformed intents ─────────────────────────────────────────────────────

    /// A malformed intent fails fast: Rejected with a single intake step and
    /// no axiom evaluation.
    #[test]
    fn malformed_intent_fails_before_axioms() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let mut intent = make_intent("intent-bad", "update", json!({}));
        intent.payload.scope = ScopePattern::new("unregistered/thing");

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Rejected);
        assert_eq!(result.reasoning_chain.len(), 1);
        assert_eq!(result.reasoning_chain[0].check, "intake/well-formed");
        assert!(result.reasoning_chain[0].note.contains("unregistered"));
        assert!(result.violated_axioms.is_empty());
    }

    #[test]
    fn empty_action_is_malformed() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let intent = make_intent("intent-empty", "", json!({}));

        let result = validate(&intent, &ctx(), &store.snapshot());
        assert_eq!(result.decision, Decision::Rejected);
        assert!(result.reasoning_chain[0].note.contains("action is empty"));
    }

    // ── Soft violations and obligations ───────────────────────────────────────

    /// An unmet soft obligation is recorded and yields NeedsModification,
    /// never a rejection.
    #[test]
    fn soft_violation_requests_modification() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let intent = make_intent("intent-soft", "adjust_weights", json!({}));
        let mut context = ctx();
        context.flags.insert("lineage-missing".to_string(), true);

        let result = validate(&intent, &context, &store.snapshot());

        assert_eq!(result.decision, Decision::NeedsModification);
        assert_eq!(result.violated_axioms.len(), 1);
        assert_eq!(result.violated_axioms[0].axiom_id.0, "declare_lineage");
        assert_eq!(result.violated_axioms[0].enforcement, Enforcement::Soft);
    }

    /// Hard and soft violations together: Rejected, and the chain lists both
    /// failed checks — no short-circuit after the first hard violation.
    #[test]
    fn rejection_lists_every_violated_check() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let mut intent = make_intent(
            "intent-multi",
            "update",
            json!({ "action": "disable_safety" }),
        );
        intent.origin = "rogue-component".to_string();

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Rejected);
        let ids: Vec<&str> = result
            .violated_axioms
            .iter()
            .map(|v| v.axiom_id.0.as_str())
            .collect();
        // Ordered by priority descending.
        assert_eq!(ids, vec!["no_harm", "no_untrusted_writes"]);
        assert!(!result.reasoning_chain.is_empty());
    }

    /// A read-only intent triggers the permission axiom, recorded in the
    /// chain without affecting the decision.
    #[test]
    fn permissions_are_recorded_not_decided() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let mut intent = make_intent("intent-read", "observe", json!({}));
        intent.payload.mode = AccessMode::Read;

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Approved);
        let step = result
            .reasoning_chain
            .iter()
            .find(|s| s.check == "axiom/observation_sanctioned")
            .expect("permission axiom must appear in the chain");
        assert_eq!(step.outcome, CheckOutcome::Recorded);
        assert!(step.note.contains("sanctions"));
    }

    // ── Canon lineage ─────────────────────────────────────────────────────────

    /// An intent cannot claim a priority above its objective's lineage cap.
    #[test]
    fn priority_above_lineage_cap_is_rejected() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let mut intent = make_intent("intent-greedy", "adjust_weights", json!({}));
        // "throughput" caps at 30 (its own priority, under "stability" at 50).
        intent.priority = 45;

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Rejected);
        assert!(result
            .violated_axioms
            .iter()
            .any(|v| v.axiom_id.0 == "canon/priority-cap"));
    }

    #[test]
    fn unknown_objective_is_rejected() {
        let store = ConstraintStore::from_toml_str(CANON).unwrap();
        let mut intent = make_intent("intent-lost", "adjust_weights", json!({}));
        intent.objective = Some(ObjectiveId::new("does-not-exist"));

        let result = validate(&intent, &ctx(), &store.snapshot());

        assert_eq!(result.decision, Decision::Rejected);
        assert!(result
            .violated_axioms
            .iter()
            .any(|v| v.axiom_id.0 == "canon/unknown-objective"));
    }
}
