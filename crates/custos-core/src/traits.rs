//! Trait seams for components that live outside the core.

use tracing::info;

use custos_contracts::escalation::Escalation;

/// The human authority channel.
///
/// The gateway calls this when a decision is suspended; delivery is
/// best-effort and the deadline default applies whether or not anyone was
/// listening.
pub trait Notifier: Send + Sync {
    fn notify_escalation(&self, escalation: &Escalation);
}

/// A notifier that only logs. The default when no external channel is wired.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_escalation(&self, escalation: &Escalation) {
        info!(
            escalation_id = %escalation.id,
            reason = %escalation.reason,
            deadline = %escalation.deadline,
            intents = escalation.intent_ids.len(),
            "escalation raised, awaiting human verdict"
        );
    }
}
