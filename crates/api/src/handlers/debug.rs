use axum::extract::State;
use axum::Json;
use indexmap::IndexMap;
use qgjob_core::types::JobId;

use crate::state::AppState;

/// GET /debug/groups
///
/// Every non-empty group, keyed by its rendered `(app_version_id, target)`
/// pair, mapped to its job ids in arrival order.
pub async fn list_groups(State(state): State<AppState>) -> Json<IndexMap<String, Vec<JobId>>> {
    Json(state.store.group_listing().await)
}
