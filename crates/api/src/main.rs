use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use qgjob_core::store::JobStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qgjob_api::config::ServerConfig;
use qgjob_api::engine::{Agent, JobScheduler};
use qgjob_api::router::build_app_router;
use qgjob_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "qgjob_api=debug,qgjob_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        runner = %config.runner.program,
        runner_args = ?config.runner.args,
        job_timeout_secs = config.scheduler.job_timeout.as_secs(),
        "Loaded server configuration",
    );

    // --- Job store ---
    let store = Arc::new(JobStore::new());

    // --- Scheduler (started exactly once) ---
    let runner = Arc::new(config.runner.build_runner());
    let agent = Agent::new(Arc::clone(&store), runner)
        .with_job_timeout(config.scheduler.job_timeout);
    let scheduler = JobScheduler::new(Arc::clone(&store), agent)
        .with_poll_interval(config.scheduler.poll_interval)
        .spawn();
    tracing::info!("Job scheduler spawned");

    // --- App state ---
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping scheduler");

    let stopped = scheduler
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if stopped {
        tracing::info!("Job scheduler stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
