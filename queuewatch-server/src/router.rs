use crate::subsystems::mutator::{AgentStateMutator, MutationOutcome};
use queuewatch_core::ami::AmiEvent;
use queuewatch_core::{classify, Classification, ClassifierConfig, Diagnostic, Intent};

/// Result of routing one event through classification and mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied(MutationOutcome),
    Ignored,
    Rejected(Diagnostic),
}

/// Classify one event and apply its intent. Runs to completion before the
/// caller may hand over the next event.
pub async fn handle_event(
    event: &AmiEvent,
    classifier: &ClassifierConfig,
    mutator: &AgentStateMutator,
) -> EventOutcome {
    match classify(event, classifier) {
        Classification::Intent(intent) => EventOutcome::Applied(apply_intent(&intent, mutator).await),
        Classification::Ignored => {
            tracing::trace!(event = %event.tag, "Ignoring untracked event");
            EventOutcome::Ignored
        }
        Classification::Rejected(diagnostic) => {
            tracing::warn!(event = %event.tag, fields = ?event.fields, "Dropping event: {}", diagnostic);
            EventOutcome::Rejected(diagnostic)
        }
    }
}

pub async fn apply_intent(intent: &Intent, mutator: &AgentStateMutator) -> MutationOutcome {
    match intent {
        Intent::Login(login) => mutator.create_session(login).await,
        Intent::Logoff(logoff) => mutator.delete_session(logoff).await,
        Intent::Status(status) => mutator.update_session(status).await,
    }
}
