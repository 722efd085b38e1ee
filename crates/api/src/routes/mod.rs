pub mod debug;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the job API route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                  submit (POST)
/// /jobs/{job_id}         status (GET)
///
/// /debug/groups          pending groups and their job ids (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .merge(debug::router())
}
