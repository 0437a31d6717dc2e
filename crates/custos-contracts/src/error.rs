//! The unified error type for the CUSTOS governance core.
//!
//! All fallible operations return `CustosResult<T>`. Variants carry enough
//! context to produce actionable audit entries; terminal rejections and
//! escalations are always recorded to the ledger before being returned.

use thiserror::Error;

/// The unified error type for the governance core.
#[derive(Debug, Error)]
pub enum CustosError {
    /// The intent failed structural intake checks before any axiom was
    /// evaluated. Never retried by the core.
    #[error("malformed intent: {reason}")]
    MalformedIntent { reason: String },

    /// A hard axiom rejected the intent. Terminal for this intent; the
    /// originator may submit a revised one.
    #[error("axiom '{axiom_id}' violated by intent '{intent_id}'")]
    AxiomViolation { axiom_id: String, intent_id: String },

    /// The intent lost a priority-lattice conflict to a higher-priority
    /// intent. Terminal for the losing intent.
    #[error("intent '{intent_id}' lost priority conflict to '{winner_id}'")]
    LostPriorityConflict { intent_id: String, winner_id: String },

    /// An exact priority tie cannot be broken automatically; the conflict
    /// has been escalated for human input.
    #[error("priority tie requires escalation '{escalation_id}'")]
    TieRequiresEscalation { escalation_id: String },

    /// Release requested for an intent that still sits in an unreconciled
    /// conflict component. Refused until `reconcile` settles the component.
    #[error("intent '{intent_id}' is in an unreconciled conflict component")]
    UnresolvedConflict { intent_id: String },

    /// A rollback targeted a checkpoint that does not exist. Governed state
    /// is unchanged.
    #[error("unknown checkpoint '{checkpoint_id}'")]
    UnknownCheckpoint { checkpoint_id: String },

    /// A committed intent between the target checkpoint and the present was
    /// marked as having an external side effect. The core cannot un-execute
    /// it; the rollback is refused and the discrepancy reported.
    #[error(
        "cannot roll back past intent '{intent_id}': committed with an external side effect"
    )]
    IrreversibleSideEffect { intent_id: String },

    /// A stored checkpoint blob no longer matches its recorded digest.
    #[error("checkpoint '{checkpoint_id}' failed integrity verification")]
    CheckpointCorrupt { checkpoint_id: String },

    /// The named path does not exist in the checkpoint state being restored.
    #[error("state path '{path}' not found in checkpoint '{checkpoint_id}'")]
    UnknownStatePath { checkpoint_id: String, path: String },

    /// An axiom append raced a newer version. Reported to the human-authoring
    /// path; the store is unchanged.
    #[error(
        "version conflict on axiom '{axiom_id}': version {proposed} is not newer than committed version {existing}"
    )]
    VersionConflict {
        axiom_id: String,
        existing: u32,
        proposed: u32,
    },

    /// Chain verification found a record whose linkage or content hash does
    /// not hold. Never auto-repaired; dependent operations halt until an
    /// operator clears the break.
    #[error("audit chain break detected at sequence {sequence}")]
    AuditChainBreak { sequence: u64 },

    /// The referenced intent is not known to the kernel.
    #[error("unknown intent '{intent_id}'")]
    UnknownIntent { intent_id: String },

    /// The referenced escalation is not known to the gateway.
    #[error("unknown escalation '{escalation_id}'")]
    UnknownEscalation { escalation_id: String },

    /// The operation is not legal in the intent's current lifecycle phase.
    #[error("intent '{intent_id}' is {phase}; {operation} is not permitted")]
    InvalidPhase {
        intent_id: String,
        phase: String,
        operation: String,
    },

    /// A constraint set failed to load or failed structural validation.
    /// Fatal at startup.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The ledger could not persist a record. A decision that cannot be
    /// audited cannot be returned.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },
}

/// Convenience alias used throughout the CUSTOS crates.
pub type CustosResult<T> = Result<T, CustosError>;
