//! Job request model and grouping key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Priority assigned when the submitter does not provide one.
pub const DEFAULT_PRIORITY: i32 = 1;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// An immutable test-execution request, as submitted via `POST /jobs`.
///
/// `priority` is accepted and kept with the job but does not influence the
/// order in which groups are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub org_id: String,
    pub app_version_id: String,
    pub test_path: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub target: String,
}

/// The `(app_version_id, target)` pair that decides which jobs run together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub app_version_id: String,
    pub target: String,
}

impl GroupKey {
    pub fn new(app_version_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            app_version_id: app_version_id.into(),
            target: target.into(),
        }
    }

    /// The key a job belongs to. Org, test path and priority are ignored.
    pub fn of(job: &JobPayload) -> Self {
        Self::new(job.app_version_id.clone(), job.target.clone())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.app_version_id, self.target)
    }
}

/// Reject payloads with blank required fields.
pub fn validate_payload(job: &JobPayload) -> Result<(), CoreError> {
    let fields = [
        ("org_id", &job.org_id),
        ("app_version_id", &job.app_version_id),
        ("test_path", &job.test_path),
        ("target", &job.target),
    ];

    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(CoreError::Validation(format!("{name} must not be empty")));
        }
    }
    Ok(())
}
