//! # custos-canon
//!
//! The constraint store: the immutable axiom set and the versioned canon
//! objective forest every governance decision is checked against.
//!
//! Loading is TOML-driven and fatal on structural defects. Reads go through
//! pinned snapshots so a batch of concurrent validations always sees one
//! consistent constraint set; the only write path is the versioned,
//! audit-coupled `append_axiom` reserved for human authoring.

pub mod snapshot;
pub mod store;

pub use snapshot::ConstraintSnapshot;
pub use store::{CanonConfig, ConstraintStore};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use custos_audit::{AuditSink, MemoryLedger};
    use custos_contracts::{
        audit::AuditAction,
        axiom::{Axiom, AxiomId, AxiomKind, Condition, Enforcement},
        error::CustosError,
        scope::ScopePattern,
    };

    use super::ConstraintStore;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const BASE: &str = r#"
        scope_roots = ["objectives", "infrastructure"]

        [[axioms]]
        id = "no_harm"
        version = 1
        priority = 100
        kind = "prohibition"
        scope = "objectives/*"
        condition = { check = "action-equals", value = "disable_safety" }
        enforcement = "hard"
        created_at = "2025-01-01T00:00:00Z"
        created_by = "governance-board"

        [[axioms]]
        id = "prefer_gradual"
        version = 1
        priority = 40
        kind = "prohibition"
        scope = "objectives/weights/*"
        condition = { check = "context-flag", flag = "bulk-update" }
        enforcement = "soft"
        created_at = "2025-01-01T00:00:00Z"
        created_by = "governance-board"

        [[objectives]]
        id = "stability"
        priority = 50
        axiom_refs = ["no_harm"]

        [[objectives]]
        id = "throughput"
        priority = 30
        parent = "stability"
    "#;

    fn make_axiom(id: &str, version: u32) -> Axiom {
        Axiom {
            id: AxiomId::new(id),
            version,
            priority: 10,
            kind: AxiomKind::Prohibition,
            scope: ScopePattern::new("objectives/*"),
            condition: Condition::Always,
            enforcement: Enforcement::Hard,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            created_by: "governance-board".to_string(),
        }
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    #[test]
    fn loads_a_valid_constraint_set() {
        let store = ConstraintStore::from_toml_str(BASE).unwrap();
        let snap = store.snapshot();
        assert!(snap.latest_axiom(&AxiomId::new("no_harm")).is_some());
        assert_eq!(snap.objectives().count(), 2);
        assert!(snap.is_known_root("objectives"));
        assert!(!snap.is_known_root("agents"));
    }

    #[test]
    fn rejects_priority_tie_without_tie_break() {
        let toml = r#"
            scope_roots = ["objectives"]

            [[objectives]]
            id = "a"
            priority = 10

            [[objectives]]
            id = "b"
            priority = 10
        "#;
        match ConstraintStore::from_toml_str(toml) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("tie_break"), "{reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn accepts_priority_tie_covered_by_tie_break() {
        let toml = r#"
            scope_roots = ["objectives"]
            tie_break = ["a", "b"]

            [[objectives]]
            id = "a"
            priority = 10

            [[objectives]]
            id = "b"
            priority = 10
        "#;
        let store = ConstraintStore::from_toml_str(toml).unwrap();
        let snap = store.snapshot();
        use custos_contracts::canon::ObjectiveId;
        assert_eq!(
            snap.rank_objectives(&ObjectiveId::new("a"), &ObjectiveId::new("b")),
            std::cmp::Ordering::Less,
            "tie_break order must decide equal priorities"
        );
    }

    #[test]
    fn rejects_cycle_in_objective_forest() {
        let toml = r#"
            scope_roots = ["objectives"]

            [[objectives]]
            id = "a"
            priority = 10
            parent = "b"

            [[objectives]]
            id = "b"
            priority = 20
            parent = "a"
        "#;
        match ConstraintStore::from_toml_str(toml) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("cycle"), "{reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_dangling_axiom_ref() {
        let toml = r#"
            scope_roots = ["objectives"]

            [[objectives]]
            id = "a"
            priority = 10
            axiom_refs = ["missing"]
        "#;
        match ConstraintStore::from_toml_str(toml) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("missing"), "{reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_axiom_outside_registered_roots() {
        let toml = r#"
            scope_roots = ["objectives"]

            [[axioms]]
            id = "stray"
            version = 1
            priority = 1
            kind = "prohibition"
            scope = "agents/*"
            condition = { check = "always" }
            enforcement = "hard"
            created_at = "2025-01-01T00:00:00Z"
            created_by = "governance-board"
        "#;
        assert!(matches!(
            ConstraintStore::from_toml_str(toml),
            Err(CustosError::ConfigError { .. })
        ));
    }

    // ── Snapshot queries ──────────────────────────────────────────────────────

    #[test]
    fn axioms_for_orders_by_priority_then_enforcement() {
        let store = ConstraintStore::from_toml_str(BASE).unwrap();
        let snap = store.snapshot();

        let matched = snap.axioms_for(&ScopePattern::new("objectives/weights/alpha"));
        let ids: Vec<&str> = matched.iter().map(|a| a.id.0.as_str()).collect();
        assert_eq!(ids, vec!["no_harm", "prefer_gradual"]);
    }

    #[test]
    fn effective_priority_cap_is_min_over_lineage() {
        let store = ConstraintStore::from_toml_str(BASE).unwrap();
        let snap = store.snapshot();
        use custos_contracts::canon::ObjectiveId;

        // "throughput" (30) under "stability" (50): cap is 30.
        assert_eq!(
            snap.effective_priority_cap(&ObjectiveId::new("throughput")),
            Some(30)
        );
        assert_eq!(
            snap.effective_priority_cap(&ObjectiveId::new("stability")),
            Some(50)
        );
        assert_eq!(snap.effective_priority_cap(&ObjectiveId::new("nope")), None);
    }

    // ── Appending ─────────────────────────────────────────────────────────────

    #[test]
    fn append_rejects_stale_version() {
        let store = ConstraintStore::from_toml_str(BASE).unwrap();
        let ledger = MemoryLedger::new();

        // no_harm is at version 1; appending version 1 again must fail.
        let stale = Axiom {
            priority: 100,
            ..make_axiom("no_harm", 1)
        };
        match store.append_axiom(stale, "governance-board", &ledger) {
            Err(CustosError::VersionConflict { existing, proposed, .. }) => {
                assert_eq!(existing, 1);
                assert_eq!(proposed, 1);
            }
            other => panic!("expected VersionConflict, got {:?}", other),
        }
        // Failed appends leave no audit record.
        assert!(ledger.is_empty());
    }

    #[test]
    fn append_writes_exactly_one_audit_record() {
        let store = ConstraintStore::from_toml_str(BASE).unwrap();
        let ledger = MemoryLedger::new();

        store
            .append_axiom(make_axiom("no_harm", 2), "governance-board", &ledger)
            .unwrap();

        let records = ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::AxiomAppended);
        assert_eq!(records[0].payload_ref, "no_harm@v2");
        assert_eq!(records[0].actor, "governance-board");

        // Both versions are retained; evaluation sees the newest.
        let snap = store.snapshot();
        assert_eq!(snap.axiom_versions(&AxiomId::new("no_harm")).len(), 2);
        assert_eq!(snap.latest_axiom(&AxiomId::new("no_harm")).unwrap().version, 2);
    }

    #[test]
    fn outstanding_snapshots_are_pinned_across_appends() {
        let store = ConstraintStore::from_toml_str(BASE).unwrap();
        let ledger = MemoryLedger::new();

        let pinned = store.snapshot();
        store
            .append_axiom(make_axiom("new_rule", 1), "governance-board", &ledger)
            .unwrap();

        // The pin still sees the pre-append world.
        assert!(pinned.latest_axiom(&AxiomId::new("new_rule")).is_none());
        assert!(store.snapshot().latest_axiom(&AxiomId::new("new_rule")).is_some());
    }
}
