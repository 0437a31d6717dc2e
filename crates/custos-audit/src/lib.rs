//! # custos-audit
//!
//! Append-only, SHA-256 hash-chained audit ledger for the CUSTOS governance
//! core.
//!
//! ## Overview
//!
//! Every state-changing operation in the core produces one `AuditRecord`
//! that links to its predecessor via `prev_hash`. Tampering with any record
//! — even a single byte — breaks the chain and is detected by
//! `verify_chain`. A detected break is never auto-repaired: it is raised for
//! mandatory manual investigation and halts dependent operations.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custos_audit::{AuditSink, MemoryLedger};
//!
//! let ledger = MemoryLedger::new();
//! let record = ledger.append(draft)?;
//! assert!(ledger.verify_chain(0, record.sequence).is_intact());
//! ```

pub mod chain;
pub mod ledger;

pub use chain::{hash_record, verify_records, ChainStatus};
pub use ledger::{AuditSink, MemoryLedger};

// ── Tests ─────────────────────────────────────────────────────────────────────
