use crate::router::{self, EventOutcome};
use crate::subsystems::mutator::AgentStateMutator;
use queuewatch_core::ami::AmiEvent;
use queuewatch_core::ClassifierConfig;
use tokio::sync::{broadcast, mpsc};

/// Counters for one run of the event loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLoopReport {
    pub received: usize,
    pub applied: usize,
    pub failed: usize,
    pub rejected: usize,
    pub ignored: usize,
}

/// Drain events strictly in arrival order until shutdown or until intake
/// drops its sender. Each event is fully handled before the next is read.
pub async fn run_event_loop(
    mut events: mpsc::Receiver<AmiEvent>,
    classifier: ClassifierConfig,
    mutator: AgentStateMutator,
    mut shutdown: broadcast::Receiver<()>,
) -> EventLoopReport {
    let mut report = EventLoopReport::default();
    tracing::info!("Event loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::info!("Event loop shutting down");
                break;
            }
            next = events.recv() => {
                let Some(event) = next else {
                    tracing::info!("Event intake closed, stopping event loop");
                    break;
                };
                report.received += 1;
                match router::handle_event(&event, &classifier, &mutator).await {
                    EventOutcome::Applied(outcome) if outcome.is_failure() => report.failed += 1,
                    EventOutcome::Applied(_) => report.applied += 1,
                    EventOutcome::Rejected(_) => report.rejected += 1,
                    EventOutcome::Ignored => report.ignored += 1,
                }
            }
        }
    }

    tracing::info!(
        "Event loop stopped: {} received, {} applied, {} failed, {} rejected, {} ignored",
        report.received,
        report.applied,
        report.failed,
        report.rejected,
        report.ignored
    );
    report
}
