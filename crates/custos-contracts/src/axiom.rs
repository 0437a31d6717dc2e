//! Axioms: the immutable constraint layer.
//!
//! An axiom is a versioned, priority-ordered rule evaluated against every
//! intent whose scope it matches. Axioms are never mutated in place — a
//! "change" is a new version appended alongside the old one, with both
//! retained for audit. Authoring happens through an out-of-band human
//! process; the core only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intent::Intent;
use crate::scope::ScopePattern;
use crate::validation::ValidationContext;

/// Stable identifier for an axiom family. All versions of one rule share it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxiomId(pub String);

impl AxiomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// What the axiom's condition means when it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxiomKind {
    /// The condition describes a forbidden situation: condition true is a
    /// violation.
    Prohibition,
    /// The condition describes a required situation: condition false is a
    /// violation.
    Obligation,
    /// The condition describes an explicitly sanctioned situation. Recorded
    /// in the reasoning chain; never a violation.
    Permission,
}

/// How a violation of this axiom is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Enforcement {
    /// A violation rejects the intent outright.
    Hard,
    /// A violation is recorded and surfaced, but does not reject on its own.
    Soft,
}

/// A single immutable axiom version.
///
/// Invariant: once persisted, `condition`, `scope`, and `enforcement` are
/// never mutated. The constraint store enforces this by only ever appending
/// new `(id, version)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axiom {
    pub id: AxiomId,
    pub version: u32,
    /// Larger value = evaluated earlier and outranks lower-priority axioms.
    pub priority: i64,
    pub kind: AxiomKind,
    /// The part of the governed state this axiom constrains.
    pub scope: ScopePattern,
    /// Side-effect-free predicate over (intent, context).
    pub condition: Condition,
    pub enforcement: Enforcement,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// A declarative, side-effect-free predicate over an intent and its
/// evaluation context.
///
/// Conditions are data, not code: they load from the constraint TOML and
/// evaluate deterministically. Composite variants nest arbitrarily.
///
/// Example in TOML:
/// ```toml
/// condition = { check = "action-equals", value = "disable_safety" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "kebab-case")]
pub enum Condition {
    /// Always true. Useful for blanket prohibitions over a scope.
    Always,

    /// True when the intent's action equals `value` exactly.
    ActionEquals { value: String },

    /// True when the intent's action is any of `values`.
    ActionIn { values: Vec<String> },

    /// True when the intent's origin equals `value` exactly.
    OriginEquals { value: String },

    /// True when the payload parameter at the dot-path `key` equals `value`.
    /// A missing path evaluates to false.
    ParamEquals { key: String, value: Value },

    /// True when the named boolean context flag is set.
    ContextFlag { flag: String },

    /// True when the intent declares Write access to its scope.
    WritesState,

    /// Logical negation.
    Not { inner: Box<Condition> },

    /// True when every sub-condition is true. Empty list is true.
    AllOf { conditions: Vec<Condition> },

    /// True when any sub-condition is true. Empty list is false.
    AnyOf { conditions: Vec<Condition> },
}

impl Condition {
    /// Evaluate the predicate against an intent and its context.
    ///
    /// Pure: reads its arguments and nothing else, so identical inputs always
    /// produce the identical result.
    pub fn evaluate(&self, intent: &Intent, ctx: &ValidationContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::ActionEquals { value } => intent.payload.action == *value,
            Condition::ActionIn { values } => values.contains(&intent.payload.action),
            Condition::OriginEquals { value } => intent.origin == *value,
            Condition::ParamEquals { key, value } => {
                resolve_path(&intent.payload.params, key) == Some(value)
            }
            Condition::ContextFlag { flag } => ctx.flags.get(flag).copied().unwrap_or(false),
            Condition::WritesState => intent.payload.mode == crate::intent::AccessMode::Write,
            Condition::Not { inner } => !inner.evaluate(intent, ctx),
            Condition::AllOf { conditions } => {
                conditions.iter().all(|c| c.evaluate(intent, ctx))
            }
            Condition::AnyOf { conditions } => {
                conditions.iter().any(|c| c.evaluate(intent, ctx))
            }
        }
    }
}

/// Resolve a dot-notation path (e.g. `"weights.alpha"`) against a JSON value.
/// Returns `None` when any segment is missing or the value is JSON `null`.
fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) if !v.is_null() => current = v,
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use crate::intent::{AccessMode, Intent, IntentId, IntentPayload};
    use crate::scope::ScopePattern;
    use crate::validation::ValidationContext;

    use super::Condition;

    fn make_intent(action: &str, params: serde_json::Value) -> Intent {
        Intent {
            id: IntentId::new("intent-1"),
            origin: "planner".to_string(),
            timestamp: Utc::now(),
            priority: 10,
            deadline: None,
            objective: None,
            payload: IntentPayload {
                action: action.to_string(),
                scope: ScopePattern::new("objectives/weights"),
                mode: AccessMode::Write,
                params,
            },
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::at(Utc::now())
    }

    #[test]
    fn action_equals_matches_exactly() {
        let intent = make_intent("disable_safety", json!({}));
        let cond = Condition::ActionEquals { value: "disable_safety".to_string() };
        assert!(cond.evaluate(&intent, &ctx()));

        let other = make_intent("adjust_weights", json!({}));
        assert!(!cond.evaluate(&other, &ctx()));
    }

    #[test]
    fn param_equals_resolves_dot_paths() {
        let intent = make_intent("adjust", json!({ "weights": { "alpha": 0.5 } }));
        let hit = Condition::ParamEquals {
            key: "weights.alpha".to_string(),
            value: json!(0.5),
        };
        let miss = Condition::ParamEquals {
            key: "weights.beta".to_string(),
            value: json!(0.5),
        };
        assert!(hit.evaluate(&intent, &ctx()));
        assert!(!miss.evaluate(&intent, &ctx()));
    }

    #[test]
    fn composite_conditions_nest() {
        let intent = make_intent("deploy", json!({ "target": "prod" }));
        let cond = Condition::AllOf {
            conditions: vec![
                Condition::ActionIn {
                    values: vec!["deploy".to_string(), "launch".to_string()],
                },
                Condition::Not {
                    inner: Box::new(Condition::OriginEquals {
                        value: "trusted-planner".to_string(),
                    }),
                },
            ],
        };
        assert!(cond.evaluate(&intent, &ctx()));
    }

    #[test]
    fn context_flags_default_to_unset() {
        let intent = make_intent("observe", json!({}));
        let cond = Condition::ContextFlag { flag: "maintenance-window".to_string() };
        assert!(!cond.evaluate(&intent, &ctx()));

        let mut flagged = ctx();
        flagged.flags.insert("maintenance-window".to_string(), true);
        assert!(cond.evaluate(&intent, &flagged));
    }

    #[test]
    fn condition_round_trips_through_toml_form() {
        let cond = Condition::AnyOf {
            conditions: vec![
                Condition::ActionEquals { value: "halt".to_string() },
                Condition::WritesState,
            ],
        };
        let json = serde_json::to_string(&cond).unwrap();
        let decoded: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(cond, decoded);
    }
}
