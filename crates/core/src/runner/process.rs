//! External-process test runner.
//!
//! Builds `<program> <args...> <test_path>`, captures stdout/stderr and
//! enforces the per-job timeout. The child is spawned with
//! `kill_on_drop(true)` so a timed-out process is killed when dropped.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{RunError, RunOutput, TestRunner};

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Default runner program: the AppWright CLI via `npx`.
pub const DEFAULT_PROGRAM: &str = "npx";

/// Default leading arguments, placed before the test path.
pub const DEFAULT_ARGS: &[&str] = &["appwright", "test"];

/// Launches a configurable external command for every test.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
}

impl ProcessRunner {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_directory: None,
            env_vars: Vec::new(),
        }
    }

    /// Run the child process from `dir` instead of the server's cwd.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set an extra environment variable on every child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self, test_path: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(test_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, DEFAULT_ARGS.iter().copied())
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn run(&self, test_path: &str, timeout: Duration) -> Result<RunOutput, RunError> {
        let start = Instant::now();

        tracing::debug!(
            program = %self.program,
            args = ?self.args,
            test_path,
            timeout_secs = timeout.as_secs(),
            "Launching test runner",
        );

        let mut child = self.command(test_path).spawn().map_err(RunError::Spawn)?;

        // Drain both pipes in their own tasks so `child.wait()` can borrow
        // the child and a chatty process never blocks on a full pipe.
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let mut stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
        let mut stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

        // One deadline covers both the exit and the pipe drain: a background
        // descendant that inherited the pipes keeps them open after the
        // direct child has exited.
        let collected = tokio::time::timeout(timeout, async {
            let status = child.wait().await.map_err(RunError::Wait)?;
            let stdout_bytes = (&mut stdout_task).await.unwrap_or_default();
            let stderr_bytes = (&mut stderr_task).await.unwrap_or_default();
            Ok::<_, RunError>((status, stdout_bytes, stderr_bytes))
        })
        .await;

        match collected {
            Ok(Ok((status, stdout_bytes, stderr_bytes))) => Ok(RunOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms: start.elapsed().as_millis() as u64,
            }),
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                Err(e)
            }
            Err(_elapsed) => {
                stdout_task.abort();
                stderr_task.abort();
                // No-op if the direct child already exited.
                let _ = child.start_kill();
                tracing::warn!(
                    program = %self.program,
                    test_path,
                    timeout_secs = timeout.as_secs(),
                    "Test runner timed out",
                );
                Err(RunError::Timeout {
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Helper to create a temporary shell script from the given body.
    fn write_temp_script(body: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut f = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp file");
        writeln!(f, "#!/bin/bash").expect("write shebang");
        write!(f, "{body}").expect("write body");
        f
    }

    fn bash() -> ProcessRunner {
        ProcessRunner::new("bash", Vec::<String>::new())
    }

    #[test]
    fn default_command_is_appwright() {
        let runner = ProcessRunner::default();
        assert_eq!(runner.program(), "npx");
        assert_eq!(runner.args(), ["appwright", "test"]);
    }

    #[tokio::test]
    async fn test_path_is_passed_last() {
        let runner = ProcessRunner::new("bash", ["-c", "echo \"running $0\""]);
        let output = runner
            .run("tests/onboarding.spec.js", TIMEOUT)
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "running tests/onboarding.spec.js");
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let script = write_temp_script("echo passed\necho warn >&2\n");
        let output = bash()
            .run(script.path().to_str().expect("path"), TIMEOUT)
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "passed");
        assert_eq!(output.stderr.trim(), "warn");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let script = write_temp_script("echo 1 failing >&2\nexit 3\n");
        let output = bash()
            .run(script.path().to_str().expect("path"), TIMEOUT)
            .await
            .expect("run");
        assert_eq!(output.exit_code, 3);
        assert!(output.stderr.contains("1 failing"));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let runner = ProcessRunner::new("qgjob-definitely-not-installed", ["test"]);
        let result = runner.run("tests/a.spec.js", TIMEOUT).await;
        assert_matches!(result, Err(RunError::Spawn(_)));
    }

    #[tokio::test]
    async fn slow_test_times_out() {
        let script = write_temp_script("sleep 60\n");
        let result = bash()
            .run(
                script.path().to_str().expect("path"),
                Duration::from_millis(200),
            )
            .await;
        assert_matches!(result, Err(RunError::Timeout { .. }));
    }

    #[tokio::test]
    async fn background_child_holding_pipes_still_times_out() {
        let runner = ProcessRunner::new("bash", ["-c"]);
        let start = Instant::now();
        let result = runner
            .run("sleep 8 & echo hi", Duration::from_secs(1))
            .await;
        let elapsed = start.elapsed();

        assert_matches!(result, Err(RunError::Timeout { timeout_secs: 1 }));
        assert!(
            elapsed < Duration::from_secs(4),
            "run took {elapsed:?} despite a 1s timeout"
        );
    }

    #[tokio::test]
    async fn env_vars_are_applied() {
        let script = write_temp_script("echo $APPWRIGHT_TARGET\n");
        let output = bash()
            .with_env("APPWRIGHT_TARGET", "emulator")
            .run(script.path().to_str().expect("path"), TIMEOUT)
            .await
            .expect("run");
        assert_eq!(output.stdout.trim(), "emulator");
    }

    #[tokio::test]
    async fn working_directory_is_applied() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = write_temp_script("pwd\n");
        let output = bash()
            .with_working_directory(dir.path())
            .run(script.path().to_str().expect("path"), TIMEOUT)
            .await
            .expect("run");
        let expected = dir.path().canonicalize().expect("canonicalize dir");
        let expected = expected.to_str().expect("path");
        assert!(
            output.stdout.trim().ends_with(expected.trim_start_matches('/')),
            "pwd output '{}' should match working directory '{expected}'",
            output.stdout.trim(),
        );
    }
}
