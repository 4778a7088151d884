//! Delayed tasks that die with the process shutdown signal.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A future scheduled to run once after a fixed delay.
///
/// Dropping or cancelling the handle aborts the task; the shutdown signal
/// cancels it too.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn after<F>(delay: Duration, mut shutdown: broadcast::Receiver<()>, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => task.await,
                _ = shutdown.recv() => {
                    tracing::debug!("Scheduled task cancelled by shutdown");
                }
            }
        });

        Self { handle }
    }

    /// Whether the task has not run (or been cancelled) yet
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
