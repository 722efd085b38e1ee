use std::sync::Arc;

use qgjob_core::store::JobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job groups and status records, shared with the scheduler.
    pub store: Arc<JobStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
