//! # custos-contracts
//!
//! Shared types, schemas, and error contracts for the CUSTOS governance
//! core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, small pure helpers on those types,
//! and the unified error type.

pub mod audit;
pub mod axiom;
pub mod canon;
pub mod checkpoint;
pub mod conflict;
pub mod error;
pub mod escalation;
pub mod intent;
pub mod scope;
pub mod validation;
