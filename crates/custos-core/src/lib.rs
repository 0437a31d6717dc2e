//! # custos-core
//!
//! The governance kernel and the components that only make sense next to
//! it: the conflict resolver, the escalation gateway, and the trait seams
//! for external channels.
//!
//! ## Overview
//!
//! The kernel drives every intent through
//!
//!   submit → validate → reconcile → release → report
//!
//! and guarantees that no intent reaches an executor without an Approved
//! decision, a settled conflict component, and a bracketing checkpoint.
//! Priority ties are never broken silently — they escalate with a deadline
//! and an audited default of Reject.

pub mod escalate;
pub mod kernel;
pub mod resolve;
pub mod traits;

pub use escalate::EscalationGateway;
pub use kernel::{GovernanceKernel, KernelConfig};
pub use resolve::{detect, effective_priority, resolve, ResolveOutcome, PRIORITY_ORDERING_RULE};
pub use traits::{LogNotifier, Notifier};
