//! Build retry across the toolchain matrix.
//!
//! A cached known-good configuration is always tried first. Only after it
//! fails does the strategist walk the stack's full attempt matrix, in
//! order, stopping at the first attempt whose build (and, when requested,
//! test run) succeeds. The winning configuration is written back to the
//! cache so the next run against the same project skips the matrix.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use javerify_core::{classify, BuildSection, BuildStack, ToolchainAttempt};

use crate::cache::ToolchainCache;
use crate::runner::{CommandExecutionResult, CommandExecutor};

/// What one full retry pass produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub success: bool,
    pub result: CommandExecutionResult,
    pub attempt: ToolchainAttempt,
    /// 1-based matrix index, or 0 for the cached configuration.
    pub attempt_number: usize,
    pub from_cache: bool,
    pub images_tried: Vec<String>,
}

impl BuildOutcome {
    /// Flatten into the summary's build section.
    pub fn to_section(&self) -> BuildSection {
        BuildSection {
            success: self.success,
            return_code: self.result.return_code,
            duration_seconds: self.result.duration_seconds,
            image_used: self.attempt.image.clone(),
            attempt: self.attempt.clone(),
            attempt_number: self.attempt_number,
            from_cache: self.from_cache,
            images_tried: self.images_tried.clone(),
            classification: classify(self.result.return_code),
        }
    }
}

/// Drives build attempts against an execution backend, consulting and
/// feeding the per-project toolchain cache.
pub struct BuildRetryStrategist<'a> {
    executor: &'a dyn CommandExecutor,
    cache: ToolchainCache,
}

impl<'a> BuildRetryStrategist<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, cache: ToolchainCache) -> Self {
        Self { executor, cache }
    }

    /// Try the cached configuration, then the stack's attempt matrix.
    ///
    /// When `test_command` is set, an attempt only counts as successful if
    /// the test run also exits zero under that same image; a green build
    /// with red tests moves on to the next attempt. A successful outcome
    /// reports the combined build plus test duration. On exhaustion the
    /// last attempt's evidence is returned with `success == false`.
    #[allow(clippy::too_many_arguments)]
    pub async fn build_with_retry(
        &self,
        stack: BuildStack,
        build_command: &str,
        test_command: Option<&str>,
        project_path: &Path,
        artifacts_dir: &Path,
        build_timeout: Duration,
        test_timeout: Duration,
    ) -> BuildOutcome {
        let project_id = ToolchainCache::project_identifier(project_path);
        let mut images_tried = Vec::new();

        if let Some(cached) = self.cache.load(&project_id) {
            info!(image = %cached.image, "trying cached toolchain configuration");
            images_tried.push(cached.image.clone());

            let mut result = self
                .executor
                .run(&cached.image, build_command, project_path, artifacts_dir, build_timeout)
                .await;

            if result.succeeded() {
                let validation = self
                    .validate_tests(&cached.image, test_command, project_path, artifacts_dir, test_timeout)
                    .await;
                if validation.as_ref().map_or(true, CommandExecutionResult::succeeded) {
                    if let Some(test_result) = validation {
                        result.duration_seconds += test_result.duration_seconds;
                    }
                    return BuildOutcome {
                        success: true,
                        result,
                        attempt: cached,
                        attempt_number: 0,
                        from_cache: true,
                        images_tried,
                    };
                }
            }
            warn!(image = %cached.image, "cached configuration no longer builds, falling back to matrix");
        }

        let attempts = stack.attempts();
        let total = attempts.len();
        let mut last: Option<(ToolchainAttempt, CommandExecutionResult)> = None;

        for (index, attempt) in attempts.into_iter().enumerate() {
            let attempt_number = index + 1;
            info!(
                image = %attempt.image,
                attempt = attempt_number,
                total,
                "build attempt"
            );
            images_tried.push(attempt.image.clone());

            let mut result = self
                .executor
                .run(&attempt.image, build_command, project_path, artifacts_dir, build_timeout)
                .await;

            if result.succeeded() {
                let validation = self
                    .validate_tests(&attempt.image, test_command, project_path, artifacts_dir, test_timeout)
                    .await;
                if validation.as_ref().map_or(true, CommandExecutionResult::succeeded) {
                    if let Some(test_result) = validation {
                        result.duration_seconds += test_result.duration_seconds;
                    }
                    self.cache.store(&project_id, &attempt);
                    return BuildOutcome {
                        success: true,
                        result,
                        attempt,
                        attempt_number,
                        from_cache: false,
                        images_tried,
                    };
                }
                warn!(image = %attempt.image, "build succeeded but tests failed, trying next image");
            }

            last = Some((attempt, result));
        }

        // Exhausted. `attempts()` is never empty, so `last` is populated.
        let (attempt, result) = last.expect("attempt matrix is non-empty");
        BuildOutcome {
            success: false,
            result,
            attempt,
            attempt_number: total,
            from_cache: false,
            images_tried,
        }
    }

    async fn validate_tests(
        &self,
        image: &str,
        test_command: Option<&str>,
        project_path: &Path,
        artifacts_dir: &Path,
        timeout: Duration,
    ) -> Option<CommandExecutionResult> {
        let command = test_command?;

        Some(
            self.executor
                .run(image, command, project_path, artifacts_dir, timeout)
                .await,
        )
    }
}
