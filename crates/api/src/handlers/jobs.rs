//! Handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::Json;
use qgjob_core::error::CoreError;
use qgjob_core::job::{self, GroupKey, JobPayload};
use qgjob_core::status::StatusRecord;
use qgjob_core::types::JobId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Response body for a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /jobs
///
/// Queue a test job. It joins the pending group for its
/// `(app_version_id, target)` pair and is picked up by the scheduler.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<JobPayload>,
) -> AppResult<Json<SubmitJobResponse>> {
    job::validate_payload(&input)?;

    let group_key = GroupKey::of(&input);
    let org_id = input.org_id.clone();
    let priority = input.priority;
    let job_id = state.store.enqueue(input).await;

    tracing::info!(
        %job_id,
        %group_key,
        org_id = %org_id,
        priority,
        "Job submitted",
    );

    Ok(Json(SubmitJobResponse { job_id }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /jobs/{job_id}
///
/// Current status record of a job. Unknown ids (including strings that are
/// not job ids at all) respond with 404.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<StatusRecord>> {
    let record = match JobId::parse(&job_id) {
        Some(id) => state.store.get_status(&id).await,
        None => StatusRecord::not_found(job_id.clone()),
    };

    if record.is_not_found() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }));
    }

    Ok(Json(record))
}
