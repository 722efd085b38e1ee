//! Drives `JobClient` against a real server bound to an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use qgjob_api::config::{RunnerConfig, SchedulerConfig, ServerConfig};
use qgjob_api::router::build_app_router;
use qgjob_api::state::AppState;
use qgjob_cli::client::{ClientError, JobClient};
use qgjob_core::job::JobPayload;
use qgjob_core::status::JobState;
use qgjob_core::store::JobStore;

/// Serve the API on `127.0.0.1:0` and return its base URL.
async fn spawn_server(store: Arc<JobStore>) -> String {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        scheduler: SchedulerConfig {
            poll_interval: Duration::from_millis(20),
            job_timeout: Duration::from_secs(5),
        },
        runner: RunnerConfig::default(),
    };
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn payload() -> JobPayload {
    JobPayload {
        org_id: "qualgent".into(),
        app_version_id: "xyz123".into(),
        test_path: "tests/onboarding.spec.js".into(),
        priority: 1,
        target: "emulator".into(),
    }
}

#[tokio::test]
async fn submit_then_status_round_trip() {
    let store = Arc::new(JobStore::new());
    let client = JobClient::new(spawn_server(Arc::clone(&store)).await).unwrap();

    let job_id = client.submit(&payload()).await.unwrap();
    assert_eq!(store.job_count().await, 1);

    let record = client.status(&job_id).await.unwrap();
    assert_eq!(record.job_id, job_id);
    assert_eq!(record.status, JobState::Queued);
}

#[tokio::test]
async fn unknown_job_maps_to_job_not_found() {
    let client = JobClient::new(spawn_server(Arc::new(JobStore::new())).await).unwrap();

    let err = client.status("does-not-exist").await.unwrap_err();
    assert_matches!(err, ClientError::JobNotFound(id) if id == "does-not-exist");
}

#[tokio::test]
async fn validation_failure_surfaces_http_status() {
    let client = JobClient::new(spawn_server(Arc::new(JobStore::new())).await).unwrap();

    let mut job = payload();
    job.org_id = "  ".into();
    let err = client.submit(&job).await.unwrap_err();
    assert_matches!(err, ClientError::HttpStatus { status: 400, .. });
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = JobClient::new(format!("http://{addr}")).unwrap();
    let err = client.status("abc").await.unwrap_err();
    assert_matches!(err, ClientError::Request(_));
}

#[tokio::test]
async fn path_like_job_id_stays_on_the_jobs_route() {
    let client = JobClient::new(spawn_server(Arc::new(JobStore::new())).await).unwrap();

    let err = client.status("../health").await.unwrap_err();
    assert_matches!(err, ClientError::JobNotFound(id) if id == "../health");
}
