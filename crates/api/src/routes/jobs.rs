//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes for the `/jobs` resource.
///
/// ```text
/// POST   /jobs                -> submit_job
/// GET    /jobs/{job_id}       -> get_job_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/{job_id}", get(jobs::get_job_status))
}
