//! The ledger trait seam and its in-memory reference implementation.
//!
//! The ledger is a recorder, not a gate: it has no authority to reject
//! writes from other components. Gating is solely the validator's and the
//! conflict resolver's job, which keeps "every decision is logged" separable
//! from "every decision is correct". No update or delete surface exists.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use custos_contracts::{
    audit::{AuditRecord, DraftRecord},
    error::{CustosError, CustosResult},
};

use crate::chain::{hash_record, verify_records, ChainStatus};

/// The append-only sink every governance component records through.
///
/// Implementations must be safe to share across threads; appends extend a
/// strictly ordered history, so they serialize internally.
pub trait AuditSink: Send + Sync {
    /// Seal and persist one record: assign the next sequence number, link
    /// `prev_hash` to the chain head, compute `content_hash`, and append
    /// atomically.
    fn append(&self, draft: DraftRecord) -> CustosResult<AuditRecord>;

    /// Recompute hashes across `[from, to]` (inclusive, by sequence number)
    /// and report the first break, if any. Used by periodic integrity
    /// audits.
    fn verify_chain(&self, from: u64, to: u64) -> ChainStatus;

    /// A read-only copy of every record, in chain order.
    fn records(&self) -> Vec<AuditRecord>;

    /// The number of records appended so far.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The mutable interior of a `MemoryLedger`.
pub(crate) struct LedgerState {
    pub(crate) records: Vec<AuditRecord>,
    /// `content_hash` of the last record, or `GENESIS_HASH` before any
    /// record exists.
    pub(crate) head_hash: String,
}

/// An in-memory, append-only ledger backed by a SHA-256 hash chain.
///
/// `append` and `verify_chain` both acquire a `Mutex` internally; clones of
/// the `Arc` share one chain.
#[derive(Clone)]
pub struct MemoryLedger {
    pub(crate) state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                records: Vec::new(),
                head_hash: AuditRecord::GENESIS_HASH.to_string(),
            })),
        }
    }

    /// The `content_hash` of the newest record, or `GENESIS_HASH` while the
    /// ledger is empty. A compact commitment to the entire history.
    pub fn head_hash(&self) -> String {
        self.state.lock().expect("ledger lock poisoned").head_hash.clone()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryLedger {
    fn append(&self, draft: DraftRecord) -> CustosResult<AuditRecord> {
        let mut state = self.state.lock().map_err(|e| CustosError::AuditWriteFailed {
            reason: format!("ledger lock poisoned: {}", e),
        })?;

        let sequence = state.records.len() as u64;
        let prev_hash = state.head_hash.clone();
        let content_hash = hash_record(
            &prev_hash,
            sequence,
            &draft.actor,
            draft.action,
            &draft.payload_ref,
            &draft.timestamp,
        );

        let record = AuditRecord {
            id: Uuid::new_v4(),
            sequence,
            prev_hash,
            content_hash: content_hash.clone(),
            actor: draft.actor,
            action: draft.action,
            payload_ref: draft.payload_ref,
            timestamp: draft.timestamp,
        };

        state.records.push(record.clone());
        state.head_hash = content_hash;

        info!(
            sequence,
            action = ?record.action,
            actor = %record.actor,
            payload_ref = %record.payload_ref,
            "audit record appended"
        );

        Ok(record)
    }

    fn verify_chain(&self, from: u64, to: u64) -> ChainStatus {
        let state = self.state.lock().expect("ledger lock poisoned");

        if from > to || state.records.is_empty() {
            return ChainStatus::Intact;
        }
        let to = to.min(state.records.len() as u64 - 1);
        if from > to {
            return ChainStatus::Intact;
        }

        // For a mid-chain range the expected predecessor is the stored hash
        // of the record just before `from`.
        let expected_prev = if from == 0 {
            AuditRecord::GENESIS_HASH.to_string()
        } else {
            state.records[(from - 1) as usize].content_hash.clone()
        };

        let status = verify_records(
            &state.records[from as usize..=to as usize],
            &expected_prev,
        );
        if let ChainStatus::Broken { sequence } = status {
            warn!(sequence, "audit chain break detected");
        }
        status
    }

    fn records(&self) -> Vec<AuditRecord> {
        self.state.lock().expect("ledger lock poisoned").records.clone()
    }

    fn len(&self) -> u64 {
        self.state.lock().expect("ledger lock poisoned").records.len() as u64
    }
}
