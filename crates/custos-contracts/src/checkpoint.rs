//! Checkpoint metadata.
//!
//! Checkpoints form a DAG keyed by `parent`; the checkpoint store maintains
//! exactly one current pointer, swapped atomically on commit. The blob a
//! checkpoint references lives in the store; only the digest travels here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(pub Uuid);

impl CheckpointId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata for one immutable snapshot of governed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub created_at: DateTime<Utc>,
    /// Optional operator-supplied label.
    pub label: Option<String>,
    /// The checkpoint that was current when this one was taken. `None` only
    /// for the first checkpoint of a store.
    pub parent: Option<CheckpointId>,
    /// SHA-256 (hex) of the canonical JSON serialization of the state.
    pub state_digest: String,
    /// Who requested the checkpoint.
    pub created_by: String,
}
