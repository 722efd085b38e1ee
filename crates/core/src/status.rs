//! Per-job status records and the lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Exit code recorded when the test process never produced one.
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// Lifecycle state of a job.
///
/// Legal transitions: `Queued -> Running -> {Completed | Failed}`.
/// `NotFound` is only ever used for synthetic records of unknown ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    NotFound,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NotFound => "not_found",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured outcome of one test-runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl JobResult {
    /// Result recorded when the process could not be launched or completed.
    pub fn launch_failure(error: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: error.into(),
            exit_code: SENTINEL_EXIT_CODE,
        }
    }
}

/// The status of one job as returned by `GET /jobs/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub job_id: String,
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl StatusRecord {
    /// A freshly queued record.
    pub fn queued(job_id: JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobState::Queued,
            message: None,
            result: None,
            submitted_at: Some(chrono::Utc::now()),
            started_at: None,
            finished_at: None,
        }
    }

    /// Synthetic record for an id the store has never issued.
    pub fn not_found(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobState::NotFound,
            message: Some("Job not found".to_string()),
            result: None,
            submitted_at: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == JobState::NotFound
    }
}
