//! Agent state mutator
//!
//! Applies classified intents to the session store:
//!   Login  → create (insert-if-absent, keyed by session id)
//!   Logoff → delete by (queue, extension)
//!   Status → update by (queue, extension), warn when nothing matches
//!
//! Store failures are logged and swallowed. The store has already rolled the
//! change back, and the next event must still be processed.

use crate::store::SessionStore;
use queuewatch_core::classify::{LoginIntent, LogoffIntent, StatusIntent};
use std::sync::Arc;

/// What a single mutation did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Created,
    /// Redelivered login; the first write wins.
    AlreadyPresent,
    Deleted(u64),
    Updated(u64),
    /// Status update for a (queue, extension) with no active session.
    NoMatch,
    /// Store error; nothing was changed.
    Failed,
}

impl MutationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[derive(Clone)]
pub struct AgentStateMutator {
    store: Arc<dyn SessionStore>,
}

impl AgentStateMutator {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn create_session(&self, login: &LoginIntent) -> MutationOutcome {
        match self.store.insert_if_absent(login).await {
            Ok(true) => {
                tracing::info!(
                    session_id = %login.session_id,
                    queue = %login.queue,
                    extension = %login.extension,
                    "Agent '{}' logged in",
                    login.agent
                );
                MutationOutcome::Created
            }
            Ok(false) => {
                tracing::debug!(
                    session_id = %login.session_id,
                    "Session already recorded, ignoring duplicate login"
                );
                MutationOutcome::AlreadyPresent
            }
            Err(e) => {
                tracing::error!(
                    session_id = %login.session_id,
                    queue = %login.queue,
                    error = %e,
                    "Failed to insert agent session"
                );
                MutationOutcome::Failed
            }
        }
    }

    pub async fn delete_session(&self, logoff: &LogoffIntent) -> MutationOutcome {
        match self.store.delete_by_key(logoff).await {
            Ok(removed) => {
                tracing::info!(
                    queue = %logoff.queue,
                    extension = %logoff.extension,
                    removed,
                    "Agent logged off"
                );
                MutationOutcome::Deleted(removed)
            }
            Err(e) => {
                tracing::error!(
                    queue = %logoff.queue,
                    extension = %logoff.extension,
                    error = %e,
                    "Failed to remove agent session"
                );
                MutationOutcome::Failed
            }
        }
    }

    pub async fn update_session(&self, status: &StatusIntent) -> MutationOutcome {
        match self.store.update_if_exists(status).await {
            Ok(0) => {
                // Expected when the status arrives before the login, or for
                // members nobody logged in through the dialplan.
                tracing::warn!(
                    queue = %status.queue,
                    extension = %status.extension,
                    "No agent session found to update"
                );
                MutationOutcome::NoMatch
            }
            Ok(updated) => {
                tracing::info!(
                    queue = %status.queue,
                    extension = %status.extension,
                    calls_taken = status.calls_taken,
                    status = status.status,
                    "Agent status updated"
                );
                MutationOutcome::Updated(updated)
            }
            Err(e) => {
                tracing::error!(
                    queue = %status.queue,
                    extension = %status.extension,
                    error = %e,
                    "Failed to update agent status"
                );
                MutationOutcome::Failed
            }
        }
    }
}
