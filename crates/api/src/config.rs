use std::path::PathBuf;
use std::time::Duration;

use qgjob_core::runner::process::{DEFAULT_ARGS, DEFAULT_PROGRAM};
use qgjob_core::runner::ProcessRunner;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// Empty (the default) disables CORS handling entirely.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for the scheduler to finish after shutdown is
    /// requested, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Scheduler loop and per-job limits.
    pub scheduler: SchedulerConfig,
    /// External test-runner command.
    pub runner: RunnerConfig,
}

/// Timing knobs for the scheduler and agent.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Idle sleep between polls when no group is pending.
    pub poll_interval: Duration,
    /// Upper bound on a single test process.
    pub job_timeout: Duration,
}

/// Command line used to launch the test runner for each job.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub program: String,
    /// Leading arguments; the job's test path is appended after these.
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables for every runner process, e.g.
    /// BrowserStack credentials.
    pub env: Vec<(String, String)>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `8000`                  |
    /// | `CORS_ORIGINS`               | unset (no CORS)         |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                    |
    /// | `SCHEDULER_POLL_INTERVAL_MS` | `1000`                  |
    /// | `JOB_TIMEOUT_SECS`           | `600`                   |
    /// | `TEST_RUNNER_PROGRAM`        | `npx`                   |
    /// | `TEST_RUNNER_ARGS`           | `appwright test`        |
    /// | `TEST_RUNNER_WORKDIR`        | unset (server cwd)      |
    /// | `TEST_RUNNER_ENV`            | unset                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            scheduler: SchedulerConfig::from_env(),
            runner: RunnerConfig::from_env(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let poll_interval_ms: u64 = std::env::var("SCHEDULER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("SCHEDULER_POLL_INTERVAL_MS must be a valid u64");

        let job_timeout_secs: u64 = std::env::var("JOB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("JOB_TIMEOUT_SECS must be a valid u64");

        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            job_timeout: Duration::from_secs(job_timeout_secs),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(600),
        }
    }
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        let program =
            std::env::var("TEST_RUNNER_PROGRAM").unwrap_or_else(|_| DEFAULT_PROGRAM.into());

        let args = match std::env::var("TEST_RUNNER_ARGS") {
            Ok(raw) => raw.split_whitespace().map(str::to_string).collect(),
            Err(_) => DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
        };

        let working_directory = std::env::var("TEST_RUNNER_WORKDIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let env = std::env::var("TEST_RUNNER_ENV")
            .map(|raw| parse_env_pairs(&raw))
            .unwrap_or_default();

        Self {
            program,
            args,
            working_directory,
            env,
        }
    }

    /// Build the process runner described by this configuration.
    pub fn build_runner(&self) -> ProcessRunner {
        let mut runner = ProcessRunner::new(self.program.clone(), self.args.iter().cloned());
        if let Some(dir) = &self.working_directory {
            runner = runner.with_working_directory(dir.clone());
        }
        for (key, value) in &self.env {
            runner = runner.with_env(key.clone(), value.clone());
        }
        runner
    }
}

/// Parse comma-separated `KEY=VALUE` pairs.
///
/// Panics on an entry without `=`, so misconfiguration fails at startup.
fn parse_env_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) = entry
                .split_once('=')
                .unwrap_or_else(|| panic!("TEST_RUNNER_ENV entry '{entry}' must be KEY=VALUE"));
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            working_directory: None,
            env: Vec::new(),
        }
    }
}
