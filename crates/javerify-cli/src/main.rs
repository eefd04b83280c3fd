//! Javerify - patch verification for Java projects
//!
//! Takes a project directory (or a single file, whose parent directory
//! becomes the worktree) that already contains a candidate patch, builds
//! it inside disposable containers with a toolchain retry matrix, and
//! validates behavior through existing tests or synthesized smoke tests.
//!
//! Exit codes: 0 when the verdict is PASS, 1 for any other verdict,
//! 2 when a fatal precondition fails (backend unavailable, bad input).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, Level};

use javerify_core::{init_tracing, VerifyError};
use javerify_engine::runner::ContainerRunner;
use javerify_engine::{ToolchainCache, VerificationOrchestrator, VerifyOptions};

#[derive(Parser)]
#[command(name = "javerify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify that a patched Java project still builds and behaves", long_about = None)]
struct Cli {
    /// Project directory or a file inside it (the parent directory is
    /// used as the worktree)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving build logs and the verification summary
    #[arg(short, long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Directory holding per-project toolchain cache files
    #[arg(long, default_value = ".javerify-cache")]
    cache_dir: PathBuf,

    /// Build timeout in seconds
    #[arg(long, default_value_t = 1800)]
    timeout_build: u64,

    /// Test timeout in seconds
    #[arg(long, default_value_t = 1200)]
    timeout_test: u64,

    /// Container backend binary (docker-compatible CLI)
    #[arg(long, default_value = "docker", env = "JAVERIFY_BACKEND")]
    backend: String,

    /// Test command validated per build attempt and re-run for the record
    #[arg(long)]
    test_command: Option<String>,

    /// Proof-of-vulnerability test files to stage before test execution
    #[arg(long = "pov-test")]
    pov_tests: Vec<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// A file input means "verify the project this file lives in".
fn resolve_worktree(input: &Path) -> Result<PathBuf> {
    if input.is_dir() {
        return Ok(input.to_path_buf());
    }
    if input.is_file() {
        return input
            .parent()
            .map(Path::to_path_buf)
            .context("input file has no parent directory");
    }
    bail!("input path does not exist: {}", input.display());
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match run(cli).await {
        Ok(passed) => {
            if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!(error = %e, "verification aborted");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let worktree = resolve_worktree(&cli.input)?;
    info!(worktree = %worktree.display(), backend = %cli.backend, "starting verification");

    let executor = Arc::new(ContainerRunner::with_backend(&cli.backend));
    let orchestrator =
        VerificationOrchestrator::new(executor, ToolchainCache::new(&cli.cache_dir));

    let options = VerifyOptions {
        build_timeout: Duration::from_secs(cli.timeout_build),
        test_timeout: Duration::from_secs(cli.timeout_test),
        test_command: cli.test_command.clone(),
        pov_files: cli.pov_tests.clone(),
    };

    let summary = orchestrator
        .verify(&worktree, &cli.artifacts, &options)
        .await
        .map_err(|e| match e {
            VerifyError::BackendUnavailable(msg) => anyhow::anyhow!(
                "container backend `{}` is not available: {msg}",
                cli.backend
            ),
            other => anyhow::Error::from(other),
        })?;

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("summary serialization")?
    );

    Ok(summary.passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_file_input_resolves_to_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("pom.xml");
        std::fs::write(&file, "<project/>").expect("write");

        let worktree = resolve_worktree(&file).expect("resolve");
        assert_eq!(worktree, dir.path());
    }

    #[test]
    fn test_directory_input_is_used_as_is() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worktree = resolve_worktree(dir.path()).expect("resolve");
        assert_eq!(worktree, dir.path());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        assert!(resolve_worktree(Path::new("/no/such/path")).is_err());
    }
}
