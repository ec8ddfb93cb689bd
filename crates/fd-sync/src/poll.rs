//! Poll continuation — the termination predicate and the background
//! refresher that drives it.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use fd_core::execution::NodeExecution;
use fd_core::phase::WorkflowExecutionPhase;

use crate::session::ExecutionTreeSession;

/// Whether the periodic list refresh should stay active.
///
/// Polling stops only when the parent execution is terminal AND every node
/// execution in the latest batch is terminal. An empty batch always keeps
/// polling: right after a relaunch the backend has not produced any node
/// records yet, and stopping here would freeze the view on stale state.
pub fn should_poll(parent_phase: WorkflowExecutionPhase, batch: &[NodeExecution]) -> bool {
    if batch.is_empty() {
        return true;
    }
    !parent_phase.is_terminal() || batch.iter().any(|n| !n.phase().is_terminal())
}

/// Cancellable repeating refresh task for one session.
///
/// Each tick refreshes the session and re-evaluates [`should_poll`]; the task
/// stops itself once everything is terminal, or when [`Poller::stop`] fires.
pub struct Poller {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(session: ExecutionTreeSession, interval: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The session refreshed on open; consume the interval's immediate
            // first tick so the loop starts one period later.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match session.refresh().await {
                            Ok(true) => {}
                            Ok(false) => {
                                tracing::debug!("execution terminal, poller stopping");
                                break;
                            }
                            Err(e) => {
                                // The error is surfaced through the session's
                                // error slot; the next tick may succeed.
                                tracing::warn!(error = %e, "poll refresh failed");
                            }
                        }
                    }
                    _ = rx.changed() => break,
                }
            }
        });
        Self { shutdown, task }
    }

    /// Signal the task to stop at the next suspension point.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to wind down.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}
