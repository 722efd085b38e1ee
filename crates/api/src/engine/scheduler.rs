//! Background group scheduler.
//!
//! A single long-lived Tokio task that repeatedly takes the oldest pending
//! group from the [`JobStore`], hands it to the [`Agent`], and removes the
//! group once every job in it has finished. At most one group executes at a
//! time. When nothing is pending the loop sleeps for `poll_interval`.
//!
//! Cancellation is only observed between groups: a group that has started
//! always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use qgjob_core::store::JobStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::agent::Agent;

/// Default idle interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls the store and executes groups one at a time.
pub struct JobScheduler {
    store: Arc<JobStore>,
    agent: Agent,
    poll_interval: Duration,
}

impl JobScheduler {
    /// Create a scheduler with the default 1-second poll interval.
    pub fn new(store: Arc<JobStore>, agent: Agent) -> Self {
        Self {
            store,
            agent,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the scheduler loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Job scheduler started",
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.run_once().await {
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!("Job scheduler shutting down");
    }

    /// Execute the next pending group, if any.
    ///
    /// Returns `true` when a group was executed and removed.
    pub async fn run_once(&self) -> bool {
        let Some(group) = self.store.next_group().await else {
            return false;
        };

        self.agent.run_group(&group).await;
        self.store.remove_group(&group.key).await;
        true
    }

    /// Start the loop on its own Tokio task.
    pub fn spawn(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            self.run(task_cancel).await;
        });
        SchedulerHandle { cancel, handle }
    }
}

/// Owner of a running scheduler task.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Cancel the loop and wait up to `timeout` for it to exit.
    ///
    /// Returns `false` if the loop was still busy when the timeout expired.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Job scheduler task ended abnormally");
                true
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Job scheduler did not stop in time",
                );
                false
            }
        }
    }
}
