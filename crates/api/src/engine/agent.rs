//! Executes one job group, sequentially, against the test runner.
//!
//! Every job moves `queued -> running -> {completed | failed}`. A failure of
//! any kind (nonzero exit, launch error, timeout, runner panic) is recorded
//! on that job only; the remaining jobs of the group still run.

use std::sync::Arc;
use std::time::Duration;

use qgjob_core::job::JobPayload;
use qgjob_core::runner::{RunError, RunOutput, TestRunner};
use qgjob_core::status::{JobResult, JobState};
use qgjob_core::store::{Group, JobStore};
use qgjob_core::types::JobId;
use tokio::task::JoinError;

/// Default upper bound for one test process.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

/// Extra time a runner gets past the job timeout before the agent abandons it.
const RUNNER_GRACE: Duration = Duration::from_secs(1);

/// Runs all jobs of a group and writes their outcomes to the [`JobStore`].
pub struct Agent {
    store: Arc<JobStore>,
    runner: Arc<dyn TestRunner>,
    job_timeout: Duration,
}

impl Agent {
    /// Create an agent with the default 10-minute per-job timeout.
    pub fn new(store: Arc<JobStore>, runner: Arc<dyn TestRunner>) -> Self {
        Self {
            store,
            runner,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    pub fn with_job_timeout(mut self, job_timeout: Duration) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    /// Run every job of `group` in arrival order, one at a time.
    ///
    /// Returns once the last job has reached a terminal state.
    pub async fn run_group(&self, group: &Group) {
        tracing::info!(
            group_id = %group.id,
            group_key = %group.key,
            job_count = group.jobs.len(),
            "Running job group",
        );

        for (job_id, job) in &group.jobs {
            self.run_job(*job_id, job).await;
        }

        tracing::info!(group_id = %group.id, group_key = %group.key, "Job group finished");
    }

    async fn run_job(&self, job_id: JobId, job: &JobPayload) {
        if let Err(e) = self.store.mark_running(&job_id).await {
            tracing::warn!(%job_id, error = %e, "Skipping job that cannot start");
            return;
        }
        tracing::info!(%job_id, test_path = %job.test_path, "Job running");

        // The runner call gets its own task so a panic inside it surfaces as
        // a `JoinError` instead of unwinding through the scheduler.
        let runner = Arc::clone(&self.runner);
        let test_path = job.test_path.clone();
        let timeout = self.job_timeout;
        let mut task = tokio::spawn(async move { runner.run(&test_path, timeout).await });

        // Backstop for runners that do not honour their own timeout.
        let joined = match tokio::time::timeout(timeout + RUNNER_GRACE, &mut task).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                task.abort();
                tracing::warn!(
                    %job_id,
                    timeout_secs = timeout.as_secs(),
                    "Abandoned stalled test runner",
                );
                Ok(Err(RunError::Timeout {
                    timeout_secs: timeout.as_secs(),
                }))
            }
        };

        let outcome = Outcome::from_run(job_id, joined);

        match outcome.state {
            JobState::Completed => {
                tracing::info!(%job_id, exit_code = outcome.result.exit_code, "Job completed")
            }
            _ => tracing::warn!(
                %job_id,
                exit_code = outcome.result.exit_code,
                message = %outcome.message,
                "Job failed",
            ),
        }

        if let Err(e) = self
            .store
            .mark_finished(&job_id, outcome.state, outcome.message, outcome.result)
            .await
        {
            tracing::error!(%job_id, error = %e, "Failed to record job outcome");
        }
    }
}

/// Terminal status, message and result derived from one runner invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub state: JobState,
    pub message: String,
    pub result: JobResult,
}

impl Outcome {
    pub fn from_run(job_id: JobId, joined: Result<Result<RunOutput, RunError>, JoinError>) -> Self {
        match joined {
            Ok(Ok(output)) => Self::from_output(job_id, output),
            Ok(Err(e)) => Self::launch_failure(e.to_string()),
            Err(e) if e.is_panic() => Self::launch_failure("test runner panicked"),
            Err(_) => Self::launch_failure("test runner task was cancelled"),
        }
    }

    fn from_output(job_id: JobId, output: RunOutput) -> Self {
        let result = JobResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        };
        if result.exit_code == 0 {
            Self {
                state: JobState::Completed,
                message: format!("Job {job_id} completed successfully."),
                result,
            }
        } else {
            Self {
                state: JobState::Failed,
                message: format!("Test run exited with code {}", result.exit_code),
                result,
            }
        }
    }

    fn launch_failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            state: JobState::Failed,
            message: format!("Test run failed: {error}"),
            result: JobResult::launch_failure(error),
        }
    }
}
