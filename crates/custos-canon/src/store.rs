//! The constraint store: durable owner of axioms and canon objectives.
//!
//! Loading happens once at process start and is fatal on any structural
//! defect: an unresolved objective priority tie, a cycle in the objective
//! forest, or a dangling reference. The store owns its data exclusively —
//! no other component ever writes to it. The only mutation path is
//! `append_axiom`, reserved for the out-of-core human-authoring channel.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, info};

use custos_audit::AuditSink;
use custos_contracts::{
    audit::{AuditAction, DraftRecord},
    axiom::Axiom,
    canon::{CanonObjective, ObjectiveId},
    error::{CustosError, CustosResult},
};

use crate::snapshot::ConstraintSnapshot;

/// The top-level structure deserialized from a constraint TOML document.
///
/// Example:
/// ```toml
/// scope_roots = ["objectives", "infrastructure"]
///
/// [[axioms]]
/// id = "no_harm"
/// version = 1
/// priority = 100
/// kind = "prohibition"
/// scope = "objectives/*"
/// condition = { check = "action-equals", value = "disable_safety" }
/// enforcement = "hard"
/// created_at = "2025-01-01T00:00:00Z"
/// created_by = "governance-board"
///
/// [[objectives]]
/// id = "stability"
/// priority = 50
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CanonConfig {
    pub scope_roots: Vec<String>,
    #[serde(default)]
    pub tie_break: Vec<ObjectiveId>,
    #[serde(default)]
    pub axioms: Vec<Axiom>,
    #[serde(default)]
    pub objectives: Vec<CanonObjective>,
}

/// The constraint store.
///
/// Holds the current snapshot behind a mutex-guarded `Arc`; `snapshot()`
/// hands out a pin that later appends never disturb.
pub struct ConstraintStore {
    current: Mutex<Arc<ConstraintSnapshot>>,
}

impl ConstraintStore {
    /// Parse `s` as TOML and build a validated store.
    ///
    /// Returns `ConfigError` if the TOML is malformed or the constraint set
    /// fails structural validation. Startup must treat this as fatal.
    pub fn from_toml_str(s: &str) -> CustosResult<Self> {
        let config: CanonConfig = toml::from_str(s).map_err(|e| CustosError::ConfigError {
            reason: format!("failed to parse constraint TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as constraint TOML.
    pub fn from_file(path: &Path) -> CustosResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CustosError::ConfigError {
            reason: format!("failed to read constraint file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build a store from an already-deserialized config.
    pub fn from_config(config: CanonConfig) -> CustosResult<Self> {
        let snapshot = build_snapshot(config)?;
        info!(
            axiom_families = snapshot.axioms.len(),
            objectives = snapshot.objectives.len(),
            "constraint store loaded"
        );
        Ok(Self {
            current: Mutex::new(Arc::new(snapshot)),
        })
    }

    /// Pin the current snapshot.
    ///
    /// Cheap (`Arc` clone); the returned snapshot is immutable and unaffected
    /// by later appends, so one pin can serve an entire validation batch.
    pub fn snapshot(&self) -> Arc<ConstraintSnapshot> {
        self.current.lock().expect("constraint store lock poisoned").clone()
    }

    /// Append a new axiom version. Human-authoring path only.
    ///
    /// Fails with `VersionConflict` if the axiom id already exists at an
    /// equal or higher version. The audit record is written as part of the
    /// append: the ledger write is the only fallible step and happens before
    /// the snapshot swap, so either both the axiom and its audit entry land
    /// or neither does.
    pub fn append_axiom(
        &self,
        axiom: Axiom,
        actor: &str,
        ledger: &dyn AuditSink,
    ) -> CustosResult<()> {
        let mut current = self.current.lock().expect("constraint store lock poisoned");

        if let Some(latest) = current.latest_axiom(&axiom.id) {
            if latest.version >= axiom.version {
                return Err(CustosError::VersionConflict {
                    axiom_id: axiom.id.0.clone(),
                    existing: latest.version,
                    proposed: axiom.version,
                });
            }
        }

        if !axiom.scope.is_well_formed() {
            return Err(CustosError::ConfigError {
                reason: format!(
                    "axiom '{}' has malformed scope '{}'",
                    axiom.id.0, axiom.scope
                ),
            });
        }
        if let Some(root) = axiom.scope.root() {
            if !current.is_known_root(root) {
                return Err(CustosError::ConfigError {
                    reason: format!(
                        "axiom '{}' scope root '{}' is not a registered scope root",
                        axiom.id.0, root
                    ),
                });
            }
        }

        ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::AxiomAppended,
            payload_ref: format!("{}@v{}", axiom.id.0, axiom.version),
            timestamp: axiom.created_at,
        })?;

        // Swap-on-write: outstanding snapshots keep the old view.
        let mut next = (**current).clone();
        next.axioms.entry(axiom.id.clone()).or_default().push(axiom.clone());

        debug!(
            axiom_id = %axiom.id.0,
            version = axiom.version,
            actor,
            "axiom version appended"
        );
        *current = Arc::new(next);
        Ok(())
    }
}

// ── Load-time structural validation ───────────────────────────────────────────

fn build_snapshot(config: CanonConfig) -> CustosResult<ConstraintSnapshot> {
    let scope_roots: BTreeSet<String> = config.scope_roots.into_iter().collect();

    // Index axioms by family, rejecting duplicate (id, version) pairs, and
    // keep each family ascending by version.
    let mut axioms: BTreeMap<_, Vec<Axiom>> = BTreeMap::new();
    for axiom in config.axioms {
        if !axiom.scope.is_well_formed() {
            return Err(CustosError::ConfigError {
                reason: format!(
                    "axiom '{}' has malformed scope '{}'",
                    axiom.id.0, axiom.scope
                ),
            });
        }
        if let Some(root) = axiom.scope.root() {
            if !scope_roots.contains(root) {
                return Err(CustosError::ConfigError {
                    reason: format!(
                        "axiom '{}' scope root '{}' is not a registered scope root",
                        axiom.id.0, root
                    ),
                });
            }
        }
        let family = axioms.entry(axiom.id.clone()).or_default();
        if family.iter().any(|a| a.version == axiom.version) {
            return Err(CustosError::ConfigError {
                reason: format!(
                    "duplicate axiom version '{}@v{}'",
                    axiom.id.0, axiom.version
                ),
            });
        }
        family.push(axiom);
    }
    for family in axioms.values_mut() {
        family.sort_by_key(|a| a.version);
    }

    let mut objectives = BTreeMap::new();
    for objective in config.objectives {
        if objectives.insert(objective.id.clone(), objective.clone()).is_some() {
            return Err(CustosError::ConfigError {
                reason: format!("duplicate objective id '{}'", objective.id),
            });
        }
    }

    // Dangling references: parents and axiom_refs must resolve.
    for objective in objectives.values() {
        if let Some(parent) = &objective.parent {
            if !objectives.contains_key(parent) {
                return Err(CustosError::ConfigError {
                    reason: format!(
                        "objective '{}' names unknown parent '{}'",
                        objective.id, parent
                    ),
                });
            }
        }
        for axiom_ref in &objective.axiom_refs {
            if !axioms.contains_key(axiom_ref) {
                return Err(CustosError::ConfigError {
                    reason: format!(
                        "objective '{}' references unknown axiom '{}'",
                        objective.id, axiom_ref.0
                    ),
                });
            }
        }
    }
    for tie_id in &config.tie_break {
        if !objectives.contains_key(tie_id) {
            return Err(CustosError::ConfigError {
                reason: format!("tie_break references unknown objective '{}'", tie_id),
            });
        }
    }

    // Cycle detection: walk each objective's parent chain. The forest is
    // small and static, so the quadratic walk is fine.
    for objective in objectives.values() {
        let mut seen = BTreeSet::new();
        seen.insert(&objective.id);
        let mut cursor = objective.parent.as_ref();
        while let Some(parent_id) = cursor {
            if !seen.insert(parent_id) {
                return Err(CustosError::ConfigError {
                    reason: format!(
                        "cycle in objective forest through '{}'",
                        objective.id
                    ),
                });
            }
            cursor = objectives
                .get(parent_id)
                .and_then(|p| p.parent.as_ref());
        }
    }

    // Priority ties must be resolved by the explicit tie-break list.
    let mut by_priority: BTreeMap<i64, Vec<&ObjectiveId>> = BTreeMap::new();
    for objective in objectives.values() {
        by_priority.entry(objective.priority).or_default().push(&objective.id);
    }
    for (priority, ids) in &by_priority {
        if ids.len() > 1 {
            let uncovered: Vec<_> = ids
                .iter()
                .filter(|id| !config.tie_break.contains(**id))
                .collect();
            if !uncovered.is_empty() {
                return Err(CustosError::ConfigError {
                    reason: format!(
                        "objective priority {} is shared by {:?} without an explicit tie_break entry",
                        priority,
                        ids.iter().map(|id| id.0.as_str()).collect::<Vec<_>>()
                    ),
                });
            }
        }
    }

    Ok(ConstraintSnapshot {
        scope_roots,
        tie_break: config.tie_break,
        axioms,
        objectives,
    })
}
