//! Top-level verification state machine.
//!
//! One run walks DETECTING, BUILDING, ARTIFACT_CHECK, TEST_DISCOVERY and
//! a behavior-validation phase (existing tests, synthesized smoke tests,
//! or neither), then persists a summary document with exactly one of
//! PASS, FAIL, ERROR or SKIP. Nothing past the precondition probe is
//! allowed to abort the run; phase failures become the verdict.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use javerify_core::{
    BehaviorSection, BuildStack, PhaseTiming, Result, TestSection, TestSuiteAggregate,
    VerdictStatus, VerificationSummary, VerifyError,
};

use crate::artifacts::validate_artifacts;
use crate::cache::ToolchainCache;
use crate::detector::{detect_project, ProjectProfile};
use crate::discovery::discover_tests;
use crate::pov::copy_pov_tests;
use crate::reports::aggregate_reports;
use crate::retry::BuildRetryStrategist;
use crate::runner::CommandExecutor;
use crate::smoke::SmokeTestSynthesizer;
use crate::versions::detect_versions;

const SUMMARY_FILE: &str = "verification_summary.json";

/// Caller-tunable knobs for one verification run.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub build_timeout: Duration,
    pub test_timeout: Duration,
    /// Caller-supplied test command, validated per attempt during retry
    /// and re-run once for the summary.
    pub test_command: Option<String>,
    /// Proof-of-vulnerability test files staged before behavior
    /// validation.
    pub pov_files: Vec<PathBuf>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            build_timeout: Duration::from_secs(1800),
            test_timeout: Duration::from_secs(1200),
            test_command: None,
            pov_files: Vec::new(),
        }
    }
}

pub struct VerificationOrchestrator {
    executor: Arc<dyn CommandExecutor>,
    cache: ToolchainCache,
}

impl VerificationOrchestrator {
    pub fn new(executor: Arc<dyn CommandExecutor>, cache: ToolchainCache) -> Self {
        Self { executor, cache }
    }

    /// Run one full verification and persist its summary into the
    /// artifacts directory.
    ///
    /// Errors only on the fatal preconditions: unavailable backend,
    /// unusable paths, or summary I/O. Everything else ends in a
    /// summary with a FAIL/ERROR/SKIP verdict.
    pub async fn verify(
        &self,
        project_path: &Path,
        artifacts_dir: &Path,
        options: &VerifyOptions,
    ) -> Result<VerificationSummary> {
        if !self.executor.is_available().await {
            return Err(VerifyError::BackendUnavailable(
                "container backend did not answer the availability probe".to_string(),
            ));
        }
        std::fs::create_dir_all(artifacts_dir)?;

        let run_id = Uuid::new_v4();
        let start = Utc::now();
        info!(%run_id, project = %project_path.display(), "verification run starting");

        // DETECTING
        let profile = match detect_project(project_path) {
            Ok(profile) => profile,
            Err(VerifyError::Detection(reason)) => {
                let summary = self.finish(
                    run_id,
                    VerdictStatus::Fail,
                    format!("project detection failed: {reason}"),
                    None,
                    Sections::default(),
                    start,
                    artifacts_dir,
                )?;
                return Ok(summary);
            }
            Err(e) => return Err(e),
        };
        info!(stack = %profile.stack, files = profile.java_file_count, "project detected");

        let mut sections = Sections {
            detected_versions: detect_versions(project_path, profile.stack),
            ..Sections::default()
        };

        // BUILDING
        let strategist = BuildRetryStrategist::new(&*self.executor, self.cache.clone());
        let outcome = strategist
            .build_with_retry(
                profile.stack,
                profile.build_command(),
                options.test_command.as_deref(),
                project_path,
                artifacts_dir,
                options.build_timeout,
                options.test_timeout,
            )
            .await;
        let build = outcome.to_section();
        let image = build.image_used.clone();
        let classification_reason = build.classification.reason.clone();
        let build_success = build.success;
        sections.build = Some(build);

        if !build_success {
            let summary = self.finish(
                run_id,
                VerdictStatus::Fail,
                format!("build failed after retries: {classification_reason}"),
                Some(&profile),
                sections,
                start,
                artifacts_dir,
            )?;
            return Ok(summary);
        }

        // ARTIFACT_CHECK
        let artifact_section = validate_artifacts(project_path, profile.stack);
        let has_artifacts = artifact_section.has_artifacts;
        sections.artifact_validation = Some(artifact_section);
        if !has_artifacts {
            let summary = self.finish(
                run_id,
                VerdictStatus::Fail,
                "build reported success but produced no artifacts".to_string(),
                Some(&profile),
                sections,
                start,
                artifacts_dir,
            )?;
            return Ok(summary);
        }

        // Caller-supplied test command, re-run once for the record.
        if let Some(command) = options.test_command.as_deref() {
            let result = self
                .executor
                .run(&image, command, project_path, artifacts_dir, options.test_timeout)
                .await;
            let failed = !result.succeeded();
            sections.legacy_test = Some(TestSection {
                command: command.to_string(),
                return_code: result.return_code,
                duration_seconds: result.duration_seconds,
            });
            if failed {
                let summary = self.finish(
                    run_id,
                    VerdictStatus::Fail,
                    "caller-supplied test command failed".to_string(),
                    Some(&profile),
                    sections,
                    start,
                    artifacts_dir,
                )?;
                return Ok(summary);
            }
        }

        // Stage exploit-reproduction tests before discovery so they are
        // picked up like any other test source.
        if !options.pov_files.is_empty() {
            let report = copy_pov_tests(project_path, &options.pov_files)?;
            info!(
                staged = report.copied_count(),
                requested = options.pov_files.len(),
                "proof-of-vulnerability tests staged"
            );
        }

        // TEST_DISCOVERY and behavior validation
        let behavior = self
            .validate_behavior(project_path, artifacts_dir, &profile, &image, options)
            .await;

        let (status, reason) = verdict_for(&behavior);
        sections.behavior_validation = Some(behavior);

        self.finish(
            run_id,
            status,
            reason,
            Some(&profile),
            sections,
            start,
            artifacts_dir,
        )
    }

    async fn validate_behavior(
        &self,
        project_path: &Path,
        artifacts_dir: &Path,
        profile: &ProjectProfile,
        image: &str,
        options: &VerifyOptions,
    ) -> BehaviorSection {
        // Plain javac projects have no test runner to drive.
        if profile.stack == BuildStack::Javac {
            return skipped_behavior("no test runner available for plain javac projects");
        }

        let discovery = discover_tests(project_path, profile.stack, profile.has_wrapper);

        if discovery.has_tests() {
            info!(
                files = discovery.test_files.len(),
                framework = %discovery.framework,
                "running discovered tests"
            );
            let Some(command) = discovery.test_commands.first().cloned() else {
                return skipped_behavior("no test command for the detected stack");
            };

            let result = self
                .executor
                .run(image, &command, project_path, artifacts_dir, options.test_timeout)
                .await;
            let results = aggregate_reports(project_path, profile.stack);
            let status = behavior_status(result.return_code, &results);

            return BehaviorSection {
                status,
                check_name: "test_execution".to_string(),
                command_executed: Some(command),
                return_code: result.return_code,
                duration_seconds: result.duration_seconds,
                success_rate: results.success_rate(),
                recommendations: recommendations_for(status, &results),
                results,
                smoke_strategy: None,
                smoke_test_files: Vec::new(),
            };
        }

        // SMOKE_TESTS
        let synthesizer = SmokeTestSynthesizer::new();
        let generation = match synthesizer.generate(project_path) {
            Ok(generation) if !generation.files.is_empty() => generation,
            Ok(_) => return skipped_behavior("no smoke tests could be generated"),
            Err(e) => {
                warn!(error = %e, "smoke synthesis failed");
                synthesizer.cleanup(project_path);
                return skipped_behavior("no smoke tests could be generated");
            }
        };

        let Some(command) = profile
            .stack
            .test_commands()
            .into_iter()
            .find(|c| profile.has_wrapper || !c.starts_with("./"))
            .map(str::to_string)
        else {
            synthesizer.cleanup(project_path);
            return skipped_behavior("no test command for the detected stack");
        };

        let result = self
            .executor
            .run(image, &command, project_path, artifacts_dir, options.test_timeout)
            .await;
        let results = aggregate_reports(project_path, profile.stack);

        // The candidate tree must not keep synthesized files, whatever
        // the run did.
        synthesizer.cleanup(project_path);

        let status = behavior_status(result.return_code, &results);
        BehaviorSection {
            status,
            check_name: "behavior_validation".to_string(),
            command_executed: Some(command),
            return_code: result.return_code,
            duration_seconds: result.duration_seconds,
            success_rate: results.success_rate(),
            recommendations: recommendations_for(status, &results),
            results,
            smoke_strategy: Some(generation.strategy),
            smoke_test_files: generation.files,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        run_id: Uuid,
        status: VerdictStatus,
        reason: String,
        profile: Option<&ProjectProfile>,
        sections: Sections,
        start: chrono::DateTime<Utc>,
        artifacts_dir: &Path,
    ) -> Result<VerificationSummary> {
        let summary = VerificationSummary {
            run_id,
            status,
            reason,
            detected_stack: profile.map(|p| p.stack),
            java_file_count: profile.map(|p| p.java_file_count).unwrap_or(0),
            size_class: profile.map(|p| p.size_class),
            has_wrapper: profile.map(|p| p.has_wrapper).unwrap_or(false),
            detected_versions: sections.detected_versions,
            build: sections.build,
            artifact_validation: sections.artifact_validation,
            legacy_test: sections.legacy_test,
            behavior_validation: sections.behavior_validation,
            timing: PhaseTiming::between(start, Utc::now()),
        };

        summary.save(&artifacts_dir.join(SUMMARY_FILE))?;
        info!(status = ?summary.status, reason = %summary.reason, "verification run finished");
        Ok(summary)
    }
}

/// Accumulated summary evidence, filled in as phases complete.
#[derive(Default)]
struct Sections {
    detected_versions: javerify_core::DetectedVersions,
    build: Option<javerify_core::BuildSection>,
    artifact_validation: Option<javerify_core::ArtifactSection>,
    legacy_test: Option<TestSection>,
    behavior_validation: Option<BehaviorSection>,
}

/// Failed tests in a parsed report beat the process exit code; a non-zero
/// exit with nothing parseable is an infrastructure problem, not a
/// behavioral regression.
fn behavior_status(return_code: i32, results: &TestSuiteAggregate) -> VerdictStatus {
    if results.failed_tests > 0 {
        VerdictStatus::Fail
    } else if return_code == 0 {
        VerdictStatus::Pass
    } else {
        VerdictStatus::Error
    }
}

fn recommendations_for(status: VerdictStatus, results: &TestSuiteAggregate) -> Vec<String> {
    match status {
        VerdictStatus::Pass => vec!["All tests passed - behavior validated".to_string()],
        VerdictStatus::Fail => vec![format!(
            "{} test(s) failed - behavior regression detected",
            results.failed_tests
        )],
        VerdictStatus::Error if results.reports_found => {
            vec!["Test infrastructure failed - tests did not execute properly".to_string()]
        }
        VerdictStatus::Error => {
            vec!["Test compilation or setup failed - no test reports generated".to_string()]
        }
        VerdictStatus::Skip => Vec::new(),
    }
}

fn skipped_behavior(reason: &str) -> BehaviorSection {
    BehaviorSection {
        status: VerdictStatus::Skip,
        check_name: "behavior_validation".to_string(),
        command_executed: None,
        return_code: 0,
        duration_seconds: 0.0,
        results: TestSuiteAggregate::default(),
        success_rate: 0.0,
        smoke_strategy: None,
        smoke_test_files: Vec::new(),
        recommendations: vec![reason.to_string()],
    }
}

fn verdict_for(behavior: &BehaviorSection) -> (VerdictStatus, String) {
    match behavior.status {
        VerdictStatus::Pass => (
            VerdictStatus::Pass,
            format!(
                "build and behavior validation passed ({}/{} tests)",
                behavior.results.passed_tests, behavior.results.total_tests
            ),
        ),
        VerdictStatus::Fail => (
            VerdictStatus::Fail,
            format!("{} test(s) failed", behavior.results.failed_tests),
        ),
        VerdictStatus::Error => (
            VerdictStatus::Error,
            "test execution failed without parseable results".to_string(),
        ),
        VerdictStatus::Skip => (
            VerdictStatus::Skip,
            behavior
                .recommendations
                .first()
                .cloned()
                .unwrap_or_else(|| "no behavior validation performed".to_string()),
        ),
    }
}
