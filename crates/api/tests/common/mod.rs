#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use qgjob_core::runner::{RunError, RunOutput, TestRunner};
use qgjob_core::store::JobStore;
use tokio::sync::{mpsc, Semaphore};
use tower::ServiceExt;

use qgjob_api::config::{RunnerConfig, SchedulerConfig, ServerConfig};
use qgjob_api::router::build_app_router;
use qgjob_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and a short scheduler poll interval.
pub fn test_config() -> ServerConfig {
    ServerConfig {
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
    }
}

/// Build the full application router around `store`, with the same
/// middleware stack production uses. No scheduler is started.
pub fn build_test_app(store: Arc<JobStore>) -> Router {
    build_test_app_with(store, test_config())
}

pub fn build_test_app_with(store: Arc<JobStore>, config: ServerConfig) -> Router {
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A submission payload for `POST /jobs`.
pub fn job_body(app_version_id: &str, target: &str) -> serde_json::Value {
    serde_json::json!({
        "org_id": "qualgent",
        "app_version_id": app_version_id,
        "test_path": "tests/onboarding.spec.js",
        "priority": 1,
        "target": target,
    })
}

// ---------------------------------------------------------------------------
// Runner doubles
// ---------------------------------------------------------------------------

/// Pretends every test passes after a short delay. Never launches a process.
pub struct SimulatedRunner {
    pub delay: Duration,
    calls: AtomicUsize,
}

impl SimulatedRunner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for SimulatedRunner {
    async fn run(&self, test_path: &str, _timeout: Duration) -> Result<RunOutput, RunError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(RunOutput {
            stdout: format!("{test_path}: 1 passed"),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: self.delay.as_millis() as u64,
        })
    }
}

/// Behaviour of [`ScriptedRunner`] for one test path.
#[derive(Clone)]
pub enum Scripted {
    Exit(i32),
    SpawnError,
    Panic,
    /// Never returns, ignoring the timeout it was given.
    Hang,
}

/// Looks up the behaviour for each test path; unknown paths pass.
pub struct ScriptedRunner {
    pub script: HashMap<String, Scripted>,
}

#[async_trait]
impl TestRunner for ScriptedRunner {
    async fn run(&self, test_path: &str, _timeout: Duration) -> Result<RunOutput, RunError> {
        match self.script.get(test_path).cloned().unwrap_or(Scripted::Exit(0)) {
            Scripted::Exit(code) => Ok(RunOutput {
                stdout: format!("ran {test_path}"),
                stderr: if code == 0 { String::new() } else { "assertion failed".into() },
                exit_code: code,
                duration_ms: 1,
            }),
            Scripted::SpawnError => Err(RunError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            ))),
            Scripted::Panic => panic!("runner blew up on {test_path}"),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

/// Blocks inside `run` until the test releases a permit, announcing each
/// test path it enters on `entered`.
pub struct GatedRunner {
    entered: mpsc::UnboundedSender<String>,
    release: Arc<Semaphore>,
}

impl GatedRunner {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>, Arc<Semaphore>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let release = Arc::new(Semaphore::new(0));
        (
            Self {
                entered: tx,
                release: Arc::clone(&release),
            },
            rx,
            release,
        )
    }
}

#[async_trait]
impl TestRunner for GatedRunner {
    async fn run(&self, test_path: &str, _timeout: Duration) -> Result<RunOutput, RunError> {
        let _ = self.entered.send(test_path.to_string());
        let permit = self.release.acquire().await.expect("semaphore closed");
        permit.forget();
        Ok(RunOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 0,
        })
    }
}
