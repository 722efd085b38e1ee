//! Route definitions for debugging endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::debug;
use crate::state::AppState;

/// Routes under `/debug`.
///
/// ```text
/// GET    /debug/groups        -> list_groups
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/debug/groups", get(debug::list_groups))
}
