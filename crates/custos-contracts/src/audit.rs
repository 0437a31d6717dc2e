//! Audit record contracts.
//!
//! Every state-changing operation in the core produces exactly one
//! `AuditRecord`. Records are hash-chained: `content_hash` commits to
//! `(prev_hash, sequence, actor, action, payload_ref, timestamp)`, and each
//! record's `prev_hash` is the previous record's `content_hash`. Breaking any
//! link invalidates every later record — tampering is detected, not
//! prevented. Hashing and chain verification live in `custos-audit`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The state-changing operations the ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    AxiomAppended,
    IntentSubmitted,
    IntentValidated,
    IntentWithdrawn,
    /// An approved-but-unreleased intent cancelled by a new superseding
    /// Rejected decision. Never a deletion.
    IntentSuperseded,
    IntentReleased,
    CommitRecorded,
    ConflictResolved,
    EscalationRaised,
    EscalationDecided,
    EscalationTimedOut,
    CheckpointCreated,
    RollbackApplied,
    PartialRollbackApplied,
}

/// The caller-supplied half of an audit record.
///
/// The ledger assigns `sequence`, links `prev_hash`, and fills
/// `content_hash` on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Who performed the operation (component name or human identity).
    pub actor: String,
    pub action: AuditAction,
    /// A reference to the operation's subject: an intent id, an axiom
    /// `id@version`, a checkpoint id, or a content digest.
    pub payload_ref: String,
    pub timestamp: DateTime<Utc>,
}

/// One sealed entry in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Strictly monotonic position in the chain, starting at 0.
    pub sequence: u64,
    /// `content_hash` of the previous record, or `GENESIS_HASH` at 0.
    pub prev_hash: String,
    /// SHA-256 (hex) over (prev_hash, sequence, actor, action, payload_ref,
    /// timestamp).
    pub content_hash: String,
    pub actor: String,
    pub action: AuditAction,
    pub payload_ref: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// The sentinel `prev_hash` for the first record in every ledger.
    ///
    /// 64 hex zeros — never the SHA-256 of real data, so genesis detection
    /// is unambiguous.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}
