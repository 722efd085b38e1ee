//! Test-runner seam.
//!
//! [`TestRunner`] is what the execution engine calls for every job. The
//! production implementation is [`process::ProcessRunner`], which launches an
//! external test process; tests plug in their own doubles.

pub mod process;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use process::ProcessRunner;

/// Captured output of a test process that ran to exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Failures that prevent a test process from producing an exit code.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to launch test runner: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed waiting for test runner: {0}")]
    Wait(#[source] std::io::Error),

    #[error("test run timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Runs a single test file and reports how the process exited.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, test_path: &str, timeout: Duration) -> Result<RunOutput, RunError>;
}
