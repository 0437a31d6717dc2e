//! The escalation gateway: suspended decisions awaiting human input.
//!
//! An escalation blocks only the intents it names; everything else proceeds.
//! Waiters park on a condition variable — no polling — and every escalation
//! carries a deadline plus a default outcome, so inaction has a defined,
//! audited consequence. The configured default is Reject; the gateway never
//! silently approves.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use custos_audit::AuditSink;
use custos_contracts::{
    audit::{AuditAction, DraftRecord},
    error::{CustosError, CustosResult},
    escalation::{
        Escalation, EscalationDefault, EscalationId, EscalationState, EscalationVerdict,
    },
    intent::IntentId,
};

use crate::traits::Notifier;

/// The gateway between the core and the human authority channel.
pub struct EscalationGateway {
    inner: Mutex<BTreeMap<EscalationId, Escalation>>,
    signal: Condvar,
    ledger: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
}

impl EscalationGateway {
    pub fn new(ledger: Arc<dyn AuditSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            signal: Condvar::new(),
            ledger,
            notifier,
        }
    }

    /// Raise an escalation: audit it, notify the human channel, and return
    /// the id the verdict must reference.
    pub fn escalate(
        &self,
        reason: &str,
        intent_ids: Vec<IntentId>,
        deadline: DateTime<Utc>,
        default_outcome: EscalationDefault,
    ) -> CustosResult<EscalationId> {
        let escalation = Escalation {
            id: EscalationId::new(),
            reason: reason.to_string(),
            intent_ids,
            raised_at: Utc::now(),
            deadline,
            default_outcome,
            state: EscalationState::Open,
        };
        let id = escalation.id;

        self.ledger.append(DraftRecord {
            actor: "kernel".to_string(),
            action: AuditAction::EscalationRaised,
            payload_ref: id.to_string(),
            timestamp: escalation.raised_at,
        })?;

        warn!(
            escalation_id = %id,
            reason,
            deadline = %deadline,
            "decision suspended pending human input"
        );
        self.notifier.notify_escalation(&escalation);

        self.inner
            .lock()
            .expect("escalation gateway lock poisoned")
            .insert(id, escalation);
        Ok(id)
    }

    /// A copy of the named escalation, if known.
    pub fn escalation(&self, id: &EscalationId) -> Option<Escalation> {
        self.inner
            .lock()
            .expect("escalation gateway lock poisoned")
            .get(id)
            .cloned()
    }

    /// Deliver the human verdict through the authority channel.
    ///
    /// Only an Open escalation can be decided. The substitution of the human
    /// verdict is audited with the human actor's identity, and every parked
    /// waiter is woken.
    pub fn resolve_escalation(
        &self,
        id: &EscalationId,
        verdict: EscalationVerdict,
        actor: &str,
    ) -> CustosResult<Escalation> {
        let mut inner = self.inner.lock().expect("escalation gateway lock poisoned");
        let escalation = inner
            .get_mut(id)
            .ok_or_else(|| CustosError::UnknownEscalation {
                escalation_id: id.to_string(),
            })?;

        match &escalation.state {
            EscalationState::Open => {}
            EscalationState::Decided { .. } => {
                return Err(CustosError::InvalidPhase {
                    intent_id: id.to_string(),
                    phase: "decided".to_string(),
                    operation: "resolve-escalation".to_string(),
                });
            }
            EscalationState::TimedOut => {
                return Err(CustosError::InvalidPhase {
                    intent_id: id.to_string(),
                    phase: "timed-out".to_string(),
                    operation: "resolve-escalation".to_string(),
                });
            }
        }

        // The verdict itself goes on the record: the trail names who decided
        // and what they decided.
        let payload_ref = match &verdict {
            EscalationVerdict::Approve { intent_id } => format!("{}:approve={}", id, intent_id),
            EscalationVerdict::RejectAll => format!("{}:reject-all", id),
        };
        self.ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::EscalationDecided,
            payload_ref,
            timestamp: Utc::now(),
        })?;

        escalation.state = EscalationState::Decided {
            by: actor.to_string(),
            verdict,
        };
        let decided = escalation.clone();

        info!(escalation_id = %id, actor, "human verdict recorded");
        self.signal.notify_all();
        Ok(decided)
    }

    /// Park until the escalation is decided or its deadline passes.
    ///
    /// On expiry the escalation transitions to TimedOut, the timeout is
    /// audited, and the caller applies the configured default outcome.
    pub fn await_verdict(&self, id: &EscalationId) -> CustosResult<Escalation> {
        let mut inner = self.inner.lock().expect("escalation gateway lock poisoned");
        loop {
            let deadline = {
                let escalation =
                    inner
                        .get(id)
                        .ok_or_else(|| CustosError::UnknownEscalation {
                            escalation_id: id.to_string(),
                        })?;
                match &escalation.state {
                    EscalationState::Decided { .. } | EscalationState::TimedOut => {
                        return Ok(escalation.clone());
                    }
                    EscalationState::Open => escalation.deadline,
                }
            };

            let now = Utc::now();
            if now >= deadline {
                if let Some(escalation) = inner.get_mut(id) {
                    escalation.state = EscalationState::TimedOut;
                    let timed_out = escalation.clone();
                    self.ledger.append(DraftRecord {
                        actor: "kernel".to_string(),
                        action: AuditAction::EscalationTimedOut,
                        payload_ref: id.to_string(),
                        timestamp: now,
                    })?;
                    warn!(
                        escalation_id = %id,
                        default = ?timed_out.default_outcome,
                        "escalation deadline passed, default outcome applies"
                    );
                    self.signal.notify_all();
                    return Ok(timed_out);
                }
                continue;
            }

            let wait = (deadline - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            let (guard, _timeout) = self
                .signal
                .wait_timeout(inner, wait)
                .expect("escalation gateway lock poisoned");
            inner = guard;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
