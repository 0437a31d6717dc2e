//! Hash-chain primitives: record hashing and chain integrity verification.
//!
//! Every field that contributes to a record's hash is listed explicitly so
//! nothing is accidentally omitted.
//!
//! Hash input layout (bytes, in order):
//!   1. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   2. sequence as 8-byte little-endian
//!   3. actor as UTF-8 bytes
//!   4. canonical JSON of action (serde_json, no pretty-printing)
//!   5. payload_ref as UTF-8 bytes
//!   6. timestamp as RFC 3339 UTF-8 bytes

use sha2::{Digest, Sha256};

use custos_contracts::audit::{AuditAction, AuditRecord};

/// Compute the SHA-256 content hash for a single audit record.
///
/// Commits to the record's position (`sequence`), its link to the previous
/// record (`prev_hash`), and every content field. Returns a lowercase
/// 64-character hex string.
pub fn hash_record(
    prev_hash: &str,
    sequence: u64,
    actor: &str,
    action: AuditAction,
    payload_ref: &str,
    timestamp: &chrono::DateTime<chrono::Utc>,
) -> String {
    // serde_json::to_vec on a unit enum variant is a stable byte string.
    let action_json =
        serde_json::to_vec(&action).expect("AuditAction must always serialize to JSON");

    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(actor.as_bytes());
    hasher.update(&action_json);
    hasher.update(payload_ref.as_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());

    hex::encode(hasher.finalize())
}

/// The result of verifying a ledger range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// Every link and every content hash held across the verified range.
    Intact,
    /// The sequence number of the first record whose linkage or content
    /// hash failed. Everything after it is untrusted.
    Broken { sequence: u64 },
}

impl ChainStatus {
    pub fn is_intact(&self) -> bool {
        matches!(self, ChainStatus::Intact)
    }
}

/// Verify the integrity of a contiguous run of audit records.
///
/// Two rules are checked for every record:
///
/// 1. **Prev-hash linkage** — `prev_hash` equals the `content_hash` of the
///    preceding record (or `GENESIS_HASH` for sequence 0). For a range that
///    starts mid-chain, the caller passes the expected predecessor hash.
/// 2. **Hash correctness** — `content_hash` matches the value recomputed
///    from the record's own fields.
///
/// Reports the first break, if any. An empty range is intact.
pub fn verify_records(records: &[AuditRecord], expected_prev: &str) -> ChainStatus {
    let mut expected_prev = expected_prev.to_string();
    let mut expected_sequence = records.first().map(|r| r.sequence);

    for record in records {
        // Sequence must be contiguous within the range.
        if Some(record.sequence) != expected_sequence {
            return ChainStatus::Broken { sequence: record.sequence };
        }

        if record.prev_hash != expected_prev {
            return ChainStatus::Broken { sequence: record.sequence };
        }

        let recomputed = hash_record(
            &record.prev_hash,
            record.sequence,
            &record.actor,
            record.action,
            &record.payload_ref,
            &record.timestamp,
        );
        if record.content_hash != recomputed {
            return ChainStatus::Broken { sequence: record.sequence };
        }

        expected_prev = record.content_hash.clone();
        expected_sequence = Some(record.sequence + 1);
    }

    ChainStatus::Intact
}
