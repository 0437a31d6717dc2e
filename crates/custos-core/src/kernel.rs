//! The governance kernel: the decision core's orchestrator.
//!
//! The kernel drives the intent lifecycle:
//!
//!   submit → validate → reconcile → release → report
//!
//! with escalation and rollback branching off it. Structural guarantees:
//! a `ReleaseTicket` is only reachable for an intent whose phase is Approved,
//! every phase change is audited before the call returns, and a detected
//! audit chain break halts all further releases until an operator clears it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tracing::{info, warn};

use custos_audit::{AuditSink, ChainStatus};
use custos_canon::ConstraintStore;
use custos_contracts::{
    audit::{AuditAction, DraftRecord},
    checkpoint::CheckpointId,
    conflict::{Conflict, Resolution},
    error::{CustosError, CustosResult},
    escalation::{Escalation, EscalationDefault, EscalationId, EscalationState, EscalationVerdict},
    intent::{ExecutorReport, Intent, IntentId, IntentPhase, ReleaseTicket, ReportOutcome},
    validation::{Decision, ValidationContext, ValidationResult},
};
use custos_state::{GovernedState, RollbackController};
use custos_validate::validate;

use crate::escalate::EscalationGateway;
use crate::resolve::{detect, resolve, ResolveOutcome, PRIORITY_ORDERING_RULE};
use crate::traits::Notifier;

/// Kernel-wide settings. The escalation default is Reject unless explicitly
/// configured otherwise.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// How long an escalation stays open before its default outcome applies.
    pub escalation_timeout: Duration,
    pub escalation_default: EscalationDefault,
    /// Checkpoint retention cap.
    pub max_checkpoints: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            escalation_timeout: Duration::minutes(5),
            escalation_default: EscalationDefault::Reject,
            max_checkpoints: custos_state::DEFAULT_MAX_CHECKPOINTS,
        }
    }
}

/// Everything the kernel tracks about one submitted intent.
struct IntentRecord {
    intent: Intent,
    phase: IntentPhase,
    validation: Option<ValidationResult>,
    ticket: Option<ReleaseTicket>,
    escalation: Option<EscalationId>,
}

/// The orchestrator owning the trusted components.
pub struct GovernanceKernel {
    canon: Arc<ConstraintStore>,
    ledger: Arc<dyn AuditSink>,
    state: RollbackController,
    gateway: EscalationGateway,
    intents: Mutex<BTreeMap<IntentId, IntentRecord>>,
    /// Sequence number of a detected chain break. While set, releases are
    /// refused.
    halted: Mutex<Option<u64>>,
    config: KernelConfig,
}

impl GovernanceKernel {
    pub fn new(
        canon: Arc<ConstraintStore>,
        ledger: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        config: KernelConfig,
    ) -> Self {
        let state = RollbackController::with_capacity(ledger.clone(), config.max_checkpoints);
        let gateway = EscalationGateway::new(ledger.clone(), notifier);
        Self {
            canon,
            ledger,
            state,
            gateway,
            intents: Mutex::new(BTreeMap::new()),
            halted: Mutex::new(None),
            config,
        }
    }

    pub fn gateway(&self) -> &EscalationGateway {
        &self.gateway
    }

    /// The lifecycle phase of a known intent.
    pub fn phase(&self, id: &IntentId) -> Option<IntentPhase> {
        self.intents
            .lock()
            .expect("intent table lock poisoned")
            .get(id)
            .map(|r| r.phase)
    }

    /// The retained validation result of a known intent.
    pub fn validation(&self, id: &IntentId) -> Option<ValidationResult> {
        self.intents
            .lock()
            .expect("intent table lock poisoned")
            .get(id)
            .and_then(|r| r.validation.clone())
    }

    // ── Intake ───────────────────────────────────────────────────────────────

    /// Accept an intent into the kernel as Pending.
    pub fn submit(&self, intent: Intent) -> CustosResult<()> {
        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        if intents.contains_key(&intent.id) {
            return Err(CustosError::MalformedIntent {
                reason: format!("intent id '{}' already submitted", intent.id),
            });
        }

        self.ledger.append(DraftRecord {
            actor: intent.origin.clone(),
            action: AuditAction::IntentSubmitted,
            payload_ref: intent.id.to_string(),
            timestamp: intent.timestamp,
        })?;

        info!(intent_id = %intent.id, origin = %intent.origin, "intent submitted");
        intents.insert(
            intent.id.clone(),
            IntentRecord {
                intent,
                phase: IntentPhase::Pending,
                validation: None,
                ticket: None,
                escalation: None,
            },
        );
        Ok(())
    }

    /// Validate one Pending intent against a pinned snapshot.
    ///
    /// The decision is audited before it is returned.
    pub fn validate_intent(
        &self,
        id: &IntentId,
        ctx: &ValidationContext,
    ) -> CustosResult<ValidationResult> {
        let snap = self.canon.snapshot();
        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        let record = known(&mut intents, id)?;
        require_phase(record, IntentPhase::Pending, "validate")?;

        let result = validate(&record.intent, ctx, &snap);

        self.ledger.append(DraftRecord {
            actor: "kernel".to_string(),
            action: AuditAction::IntentValidated,
            payload_ref: format!("{}:{}", id, decision_label(result.decision)),
            timestamp: ctx.now,
        })?;

        record.phase = phase_for(result.decision);
        record.validation = Some(result.clone());
        Ok(result)
    }

    /// Validate every Pending intent under one snapshot pin, in id order.
    pub fn validate_all_pending(
        &self,
        ctx: &ValidationContext,
    ) -> CustosResult<Vec<ValidationResult>> {
        let snap = self.canon.snapshot();
        let mut intents = self.intents.lock().expect("intent table lock poisoned");

        let pending: Vec<IntentId> = intents
            .iter()
            .filter(|(_, r)| r.phase == IntentPhase::Pending)
            .map(|(id, _)| id.clone())
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        for id in pending {
            let record = known(&mut intents, &id)?;
            let result = validate(&record.intent, ctx, &snap);
            self.ledger.append(DraftRecord {
                actor: "kernel".to_string(),
                action: AuditAction::IntentValidated,
                payload_ref: format!("{}:{}", id, decision_label(result.decision)),
                timestamp: ctx.now,
            })?;
            record.phase = phase_for(result.decision);
            record.validation = Some(result.clone());
            results.push(result);
        }
        Ok(results)
    }

    // ── Reconciliation ───────────────────────────────────────────────────────

    /// Detect and settle conflicts among Approved intents.
    ///
    /// Each conflict component is settled atomically: a strict priority
    /// winner demotes every loser to Rejected, while a top tie escalates the
    /// whole component and blocks only its members. One audit record per
    /// settlement.
    pub fn reconcile(&self) -> CustosResult<Vec<Conflict>> {
        let snap = self.canon.snapshot();
        let mut intents = self.intents.lock().expect("intent table lock poisoned");

        let approved: Vec<Intent> = intents
            .values()
            .filter(|r| r.phase == IntentPhase::Approved)
            .map(|r| r.intent.clone())
            .collect();

        let mut conflicts = detect(&approved);
        let by_id: BTreeMap<IntentId, Intent> =
            approved.into_iter().map(|i| (i.id.clone(), i)).collect();

        for conflict in &mut conflicts {
            let participants: Vec<&Intent> = conflict
                .intent_ids
                .iter()
                .filter_map(|id| by_id.get(id))
                .collect();

            match resolve(&participants, &snap) {
                ResolveOutcome::Winner { winner, losers } => {
                    let loser_list = losers
                        .iter()
                        .map(|id| id.0.as_str())
                        .collect::<Vec<_>>()
                        .join(",");
                    self.ledger.append(DraftRecord {
                        actor: "kernel".to_string(),
                        action: AuditAction::ConflictResolved,
                        payload_ref: format!(
                            "{}:winner={};rule={};losers={}",
                            conflict.id.0, winner, PRIORITY_ORDERING_RULE, loser_list
                        ),
                        timestamp: conflict.detected_at,
                    })?;
                    for loser in &losers {
                        if let Some(record) = intents.get_mut(loser) {
                            record.phase = IntentPhase::Rejected;
                            warn!(
                                intent_id = %loser,
                                winner = %winner,
                                "intent lost priority conflict"
                            );
                        }
                    }
                    conflict.resolution = Some(Resolution::Resolved {
                        winner,
                        rule_applied: PRIORITY_ORDERING_RULE.to_string(),
                    });
                }
                ResolveOutcome::Tie { contenders } => {
                    // The configured timeout, capped by the earliest deadline
                    // any tied intent declared for itself.
                    let mut deadline = Utc::now() + self.config.escalation_timeout;
                    for id in &contenders {
                        if let Some(declared) = by_id.get(id).and_then(|i| i.deadline) {
                            deadline = deadline.min(declared);
                        }
                    }
                    let escalation_id = self.gateway.escalate(
                        "effective priority tie",
                        contenders.clone(),
                        deadline,
                        self.config.escalation_default,
                    )?;
                    for id in &contenders {
                        if let Some(record) = intents.get_mut(id) {
                            record.phase = IntentPhase::Blocked;
                            record.escalation = Some(escalation_id);
                        }
                    }
                    conflict.resolution = Some(Resolution::Escalated { escalation_id });
                }
            }
        }
        Ok(conflicts)
    }

    /// Park until the escalation settles, then apply its outcome to the
    /// blocked intents.
    pub fn await_escalation(&self, id: &EscalationId) -> CustosResult<Escalation> {
        let escalation = self.gateway.await_verdict(id)?;
        self.apply_escalation(&escalation)?;
        Ok(escalation)
    }

    /// Apply a settled escalation: the approved intent (if any) returns to
    /// Approved, every other blocked intent is Rejected.
    pub fn apply_escalation(&self, escalation: &Escalation) -> CustosResult<()> {
        let approved: Option<IntentId> = match &escalation.state {
            EscalationState::Open => {
                return Err(CustosError::InvalidPhase {
                    intent_id: escalation.id.to_string(),
                    phase: "open".to_string(),
                    operation: "apply-escalation".to_string(),
                });
            }
            EscalationState::Decided { verdict, .. } => match verdict {
                EscalationVerdict::Approve { intent_id } => Some(intent_id.clone()),
                EscalationVerdict::RejectAll => None,
            },
            EscalationState::TimedOut => match escalation.default_outcome {
                EscalationDefault::Reject => None,
                EscalationDefault::ApproveFirst => escalation.intent_ids.first().cloned(),
            },
        };

        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        for id in &escalation.intent_ids {
            if let Some(record) = intents.get_mut(id) {
                if record.phase != IntentPhase::Blocked {
                    continue;
                }
                record.escalation = None;
                record.phase = if approved.as_ref() == Some(id) {
                    IntentPhase::Approved
                } else {
                    IntentPhase::Rejected
                };
            }
        }
        Ok(())
    }

    // ── Release and reporting ────────────────────────────────────────────────

    /// Checkpoint-bracket an Approved intent and hand out its ticket.
    ///
    /// Refused while the audit chain is halted, and refused while the intent
    /// sits in a conflict component `reconcile` has not settled — two
    /// overlapping approvals can never both reach an executor.
    pub fn release(&self, id: &IntentId) -> CustosResult<ReleaseTicket> {
        if let Some(sequence) = *self.halted.lock().expect("halt flag lock poisoned") {
            return Err(CustosError::AuditChainBreak { sequence });
        }

        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        {
            let record = intents.get(id).ok_or_else(|| CustosError::UnknownIntent {
                intent_id: id.to_string(),
            })?;
            require_phase(record, IntentPhase::Approved, "release")?;
        }

        let approved: Vec<Intent> = intents
            .values()
            .filter(|r| r.phase == IntentPhase::Approved)
            .map(|r| r.intent.clone())
            .collect();
        if detect(&approved).iter().any(|c| c.intent_ids.contains(id)) {
            warn!(intent_id = %id, "release refused: conflict component not reconciled");
            return Err(CustosError::UnresolvedConflict {
                intent_id: id.to_string(),
            });
        }

        let record = known(&mut intents, id)?;

        // The bracketing checkpoint. A failed checkpoint leaves the intent
        // Approved and releasable.
        let current = self.state.current_state()?;
        let checkpoint_id =
            self.state
                .checkpoint(&current, Some(format!("release:{}", id)), "kernel")?;

        let ticket = ReleaseTicket {
            intent_id: id.clone(),
            checkpoint_id,
        };

        self.ledger.append(DraftRecord {
            actor: "kernel".to_string(),
            action: AuditAction::IntentReleased,
            payload_ref: format!("{}@{}", id, checkpoint_id),
            timestamp: Utc::now(),
        })?;

        info!(intent_id = %id, checkpoint_id = %checkpoint_id, "intent released");
        record.phase = IntentPhase::Released;
        record.ticket = Some(ticket.clone());
        Ok(ticket)
    }

    /// Record the executor's mandatory report for a released intent.
    pub fn report(&self, report: ExecutorReport) -> CustosResult<()> {
        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        let record = known(&mut intents, &report.intent_id)?;
        require_phase(record, IntentPhase::Released, "report")?;
        let ticket = record
            .ticket
            .clone()
            .ok_or_else(|| CustosError::UnknownIntent {
                intent_id: report.intent_id.to_string(),
            })?;

        self.state.record_commit(&ticket, &report)?;
        record.phase = match report.outcome {
            ReportOutcome::Committed { .. } => IntentPhase::Committed,
            ReportOutcome::Failed { .. } => IntentPhase::Failed,
        };
        Ok(())
    }

    // ── Withdrawal and supersession ──────────────────────────────────────────

    /// Withdraw a Pending intent at its origin's request.
    pub fn withdraw(&self, id: &IntentId, actor: &str) -> CustosResult<()> {
        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        let record = known(&mut intents, id)?;
        require_phase(record, IntentPhase::Pending, "withdraw")?;

        self.ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::IntentWithdrawn,
            payload_ref: id.to_string(),
            timestamp: Utc::now(),
        })?;
        record.phase = IntentPhase::Withdrawn;
        Ok(())
    }

    /// Cancel an Approved-but-unreleased intent with a superseding Rejected
    /// decision. The original decision is never deleted.
    pub fn supersede(&self, id: &IntentId, actor: &str) -> CustosResult<()> {
        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        let record = known(&mut intents, id)?;
        require_phase(record, IntentPhase::Approved, "supersede")?;

        self.ledger.append(DraftRecord {
            actor: actor.to_string(),
            action: AuditAction::IntentSuperseded,
            payload_ref: id.to_string(),
            timestamp: Utc::now(),
        })?;
        record.phase = IntentPhase::Rejected;
        Ok(())
    }

    // ── State delegation ─────────────────────────────────────────────────────

    /// Snapshot the given state as a new checkpoint.
    pub fn checkpoint(
        &self,
        state: &GovernedState,
        label: Option<String>,
        actor: &str,
    ) -> CustosResult<CheckpointId> {
        self.state.checkpoint(state, label, actor)
    }

    /// The governed state as of the current checkpoint.
    pub fn current_state(&self) -> CustosResult<GovernedState> {
        self.state.current_state()
    }

    /// Roll back to a checkpoint; committed intents whose changes were
    /// undone transition to RolledBack.
    pub fn rollback(&self, checkpoint_id: &CheckpointId, actor: &str) -> CustosResult<GovernedState> {
        let outcome = self.state.rollback(checkpoint_id, actor)?;
        let mut intents = self.intents.lock().expect("intent table lock poisoned");
        for id in &outcome.undone_intents {
            if let Some(record) = intents.get_mut(id) {
                if record.phase == IntentPhase::Committed {
                    record.phase = IntentPhase::RolledBack;
                }
            }
        }
        Ok(outcome.state)
    }

    /// Splice one sub-tree back from a checkpoint, leaving unrelated later
    /// changes intact.
    pub fn rollback_field(
        &self,
        checkpoint_id: &CheckpointId,
        path: &str,
        actor: &str,
    ) -> CustosResult<GovernedState> {
        self.state.rollback_field(checkpoint_id, path, actor)
    }

    // ── Integrity ────────────────────────────────────────────────────────────

    /// Verify the whole audit chain. A detected break halts further releases
    /// until an operator clears it; it is never auto-repaired.
    pub fn verify_audit(&self) -> ChainStatus {
        let len = self.ledger.len();
        if len == 0 {
            return ChainStatus::Intact;
        }
        let status = self.ledger.verify_chain(0, len - 1);
        if let ChainStatus::Broken { sequence } = status {
            warn!(sequence, "audit chain break: halting releases");
            *self.halted.lock().expect("halt flag lock poisoned") = Some(sequence);
        }
        status
    }

    pub fn is_halted(&self) -> bool {
        self.halted.lock().expect("halt flag lock poisoned").is_some()
    }

    /// Operator acknowledgement of a chain break; re-enables releases.
    pub fn clear_halt(&self, operator: &str) {
        info!(operator, "audit halt cleared by operator");
        *self.halted.lock().expect("halt flag lock poisoned") = None;
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn known<'a>(
    intents: &'a mut BTreeMap<IntentId, IntentRecord>,
    id: &IntentId,
) -> CustosResult<&'a mut IntentRecord> {
    intents.get_mut(id).ok_or_else(|| CustosError::UnknownIntent {
        intent_id: id.to_string(),
    })
}

fn require_phase(
    record: &IntentRecord,
    expected: IntentPhase,
    operation: &str,
) -> CustosResult<()> {
    if record.phase != expected {
        return Err(CustosError::InvalidPhase {
            intent_id: record.intent.id.to_string(),
            phase: record.phase.to_string(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

fn phase_for(decision: Decision) -> IntentPhase {
    match decision {
        Decision::Approved => IntentPhase::Approved,
        Decision::Rejected => IntentPhase::Rejected,
        Decision::NeedsModification => IntentPhase::NeedsModification,
    }
}

fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Approved => "approved",
        Decision::Rejected => "rejected",
        Decision::NeedsModification => "needs-modification",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
