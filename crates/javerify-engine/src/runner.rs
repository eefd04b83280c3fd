//! Containerized command execution.
//!
//! Every build and test command runs in a fresh, disposable container with
//! exactly two bind mounts: the project worktree at `/workspace` and the
//! artifact sink at `/artifacts`. Nothing survives a container exit except
//! what lands in those mounts, so back-to-back attempts cannot contaminate
//! each other.
//!
//! Two return codes are reserved so callers can tell the guest command
//! apart from the isolation layer: 124 means the wall-clock timeout
//! expired, 125 means the backend itself failed to start or complete the
//! container process.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Reserved return code for wall-clock timeout expiry.
pub const RC_TIMEOUT: i32 = 124;

/// Reserved return code for isolation-layer failures.
pub const RC_BACKEND_ERROR: i32 = 125;

const CONTAINER_WORKSPACE: &str = "/workspace";
const CONTAINER_ARTIFACTS: &str = "/artifacts";

/// Outcome of one command execution. Log files written into the artifacts
/// directory are the durable side of this result.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandExecutionResult {
    pub return_code: i32,
    pub duration_seconds: f64,
    pub timed_out: bool,
}

impl CommandExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }
}

/// Execution backend seam. The engine only ever talks to containers
/// through this trait, which keeps the retry strategist and orchestrator
/// testable without a container daemon.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Probe the backend. A `false` here is a fatal precondition for the
    /// whole engine, never retried.
    async fn is_available(&self) -> bool;

    /// Run one shell command inside an ephemeral container.
    ///
    /// Infrastructure failures are absorbed into the reserved return
    /// codes rather than surfaced as errors; retry decisions depend on
    /// seeing them as codes.
    async fn run(
        &self,
        image: &str,
        command: &str,
        work_dir: &Path,
        artifacts_dir: &Path,
        timeout: Duration,
    ) -> CommandExecutionResult;
}

/// Container runner shelling out to a Docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct ContainerRunner {
    backend: String,
}

impl Default for ContainerRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRunner {
    pub fn new() -> Self {
        Self {
            backend: "docker".to_string(),
        }
    }

    /// Use an alternative Docker-compatible binary (e.g. podman).
    pub fn with_backend(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    fn container_args(
        image: &str,
        command: &str,
        work_dir: &Path,
        artifacts_dir: &Path,
    ) -> Vec<String> {
        let work_abs = absolute(work_dir);
        let artifacts_abs = absolute(artifacts_dir);

        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", work_abs.display(), CONTAINER_WORKSPACE),
            "-v".to_string(),
            format!("{}:{}", artifacts_abs.display(), CONTAINER_ARTIFACTS),
            "-w".to_string(),
            CONTAINER_WORKSPACE.to_string(),
            image.to_string(),
            "sh".to_string(),
            "-c".to_string(),
            command.to_string(),
        ]
    }

    async fn run_process(
        program: &str,
        args: &[String],
        artifacts_dir: &Path,
        timeout: Duration,
    ) -> CommandExecutionResult {
        let start = Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(program, error = %e, "failed to spawn container backend");
                write_log(
                    artifacts_dir,
                    "docker_error.log",
                    &format!("Failed to spawn {program}: {e}\n"),
                );
                return CommandExecutionResult {
                    return_code: RC_BACKEND_ERROR,
                    duration_seconds: start.elapsed().as_secs_f64(),
                    timed_out: false,
                };
            }
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                write_log(
                    artifacts_dir,
                    "docker_stdout.log",
                    &String::from_utf8_lossy(&output.stdout),
                );
                write_log(
                    artifacts_dir,
                    "docker_stderr.log",
                    &String::from_utf8_lossy(&output.stderr),
                );

                // A signal-killed backend has no exit code; that is an
                // isolation-layer failure, not a guest failure.
                let return_code = output.status.code().unwrap_or(RC_BACKEND_ERROR);
                CommandExecutionResult {
                    return_code,
                    duration_seconds: start.elapsed().as_secs_f64(),
                    timed_out: false,
                }
            }
            Ok(Err(e)) => {
                write_log(
                    artifacts_dir,
                    "docker_error.log",
                    &format!("Container process error: {e}\n"),
                );
                CommandExecutionResult {
                    return_code: RC_BACKEND_ERROR,
                    duration_seconds: start.elapsed().as_secs_f64(),
                    timed_out: false,
                }
            }
            Err(_elapsed) => {
                let duration = start.elapsed().as_secs_f64();
                write_log(
                    artifacts_dir,
                    "docker_error.log",
                    &format!(
                        "Timed out after {duration:.1}s (limit {}s)\n",
                        timeout.as_secs()
                    ),
                );
                CommandExecutionResult {
                    return_code: RC_TIMEOUT,
                    duration_seconds: duration,
                    timed_out: true,
                }
            }
        }
    }
}

#[async_trait]
impl CommandExecutor for ContainerRunner {
    async fn is_available(&self) -> bool {
        let probe = Command::new(&self.backend)
            .arg("ps")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(10), probe).await {
            Ok(Ok(status)) => status.success(),
            _ => false,
        }
    }

    async fn run(
        &self,
        image: &str,
        command: &str,
        work_dir: &Path,
        artifacts_dir: &Path,
        timeout: Duration,
    ) -> CommandExecutionResult {
        if let Err(e) = std::fs::create_dir_all(artifacts_dir) {
            warn!(error = %e, "could not create artifacts directory");
        }

        let args = Self::container_args(image, command, work_dir, artifacts_dir);
        debug!(image, command, "running containerized command");

        Self::run_process(&self.backend, &args, artifacts_dir, timeout).await
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn write_log(artifacts_dir: &Path, name: &str, content: &str) {
    // Log files are best-effort; losing one must not fail the run.
    if let Err(e) = std::fs::write(artifacts_dir.join(name), content) {
        warn!(name, error = %e, "failed to write execution log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_args_layout() {
        let args = ContainerRunner::container_args(
            "maven:3.9-eclipse-temurin-8",
            "mvn clean compile -B",
            Path::new("/tmp/project"),
            Path::new("/tmp/artifacts"),
        );

        assert_eq!(args[0], "run");
        assert_eq!(args[1], "--rm");
        assert!(args[3].ends_with(":/workspace"));
        assert!(args[5].ends_with(":/artifacts"));
        assert_eq!(args[6], "-w");
        assert_eq!(args[7], "/workspace");
        assert_eq!(args[8], "maven:3.9-eclipse-temurin-8");
        assert_eq!(&args[9..], ["sh", "-c", "mvn clean compile -B"]);
    }

    #[tokio::test]
    async fn test_spawn_failure_returns_backend_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = ContainerRunner::with_backend("javerify-no-such-backend");

        let result = runner
            .run(
                "eclipse-temurin:17-jdk",
                "true",
                dir.path(),
                dir.path(),
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(result.return_code, RC_BACKEND_ERROR);
        assert!(!result.timed_out);
        assert!(dir.path().join("docker_error.log").exists());
    }

    #[tokio::test]
    async fn test_missing_backend_is_unavailable() {
        let runner = ContainerRunner::with_backend("javerify-no-such-backend");
        assert!(!runner.is_available().await);
    }

    #[tokio::test]
    async fn test_timeout_returns_reserved_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args: Vec<String> = ["-c", "sleep 5"].iter().map(|s| s.to_string()).collect();

        let result =
            ContainerRunner::run_process("sh", &args, dir.path(), Duration::from_secs(1)).await;

        assert_eq!(result.return_code, RC_TIMEOUT);
        assert!(result.timed_out);
        assert!(result.duration_seconds >= 1.0);
    }

    #[tokio::test]
    async fn test_guest_exit_code_passes_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args: Vec<String> = ["-c", "exit 3"].iter().map(|s| s.to_string()).collect();

        let result =
            ContainerRunner::run_process("sh", &args, dir.path(), Duration::from_secs(5)).await;

        assert_eq!(result.return_code, 3);
        assert!(!result.succeeded());
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_stdout_log_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args: Vec<String> = ["-c", "echo hello-javerify"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result =
            ContainerRunner::run_process("sh", &args, dir.path(), Duration::from_secs(5)).await;

        assert!(result.succeeded());
        let log = std::fs::read_to_string(dir.path().join("docker_stdout.log")).expect("log");
        assert!(log.contains("hello-javerify"));
    }
}
