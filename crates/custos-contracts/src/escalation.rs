//! Escalations: suspended decisions awaiting external human input.
//!
//! An escalation blocks only the intents it names. Every escalation carries
//! a deadline and a default outcome, so the external actor always knows the
//! consequence of inaction — the core never silently approves by default.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::IntentId;

/// Identifier for an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscalationId(pub Uuid);

impl EscalationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EscalationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EscalationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What happens when the deadline passes without a human verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationDefault {
    /// Reject every suspended intent. The configured default.
    Reject,
    /// Approve the first-listed intent. Must be configured explicitly.
    ApproveFirst,
}

/// The human verdict delivered through the authority channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum EscalationVerdict {
    /// Approve the named intent; every other suspended intent in the
    /// escalation is rejected with `LostPriorityConflict`.
    Approve { intent_id: IntentId },
    /// Reject every suspended intent.
    RejectAll,
}

/// Where an escalation stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum EscalationState {
    /// Awaiting a verdict from the human authority channel.
    Open,
    /// A human decided. The substitution of their verdict for the automatic
    /// one is itself audited with their identity.
    Decided {
        by: String,
        verdict: EscalationVerdict,
    },
    /// The deadline passed; the default outcome was applied and logged.
    TimedOut,
}

/// A suspended decision, keyed by `EscalationId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub id: EscalationId,
    pub reason: String,
    /// The intents blocked by this escalation. Order matters: the first
    /// entry is the one `EscalationDefault::ApproveFirst` would approve.
    pub intent_ids: Vec<IntentId>,
    pub raised_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub default_outcome: EscalationDefault,
    pub state: EscalationState,
}
