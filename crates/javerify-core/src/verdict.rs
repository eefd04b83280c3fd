//! Verification verdicts and the persisted run-summary document.
//!
//! The summary is the hand-off artifact to any downstream decision-maker
//! ("accept patch" / "revise patch"). It is written once per run and is
//! immutable after that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::classify::FailureClassification;
use crate::stack::{BuildStack, SizeClass, ToolchainAttempt};

/// Terminal status of a verification run or of its behavior phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Fail,
    Error,
    Skip,
}

/// Wall-clock timing of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseTiming {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_duration_seconds: f64,
}

impl PhaseTiming {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let total = (end - start).num_milliseconds() as f64 / 1000.0;
        Self {
            start_time: start,
            end_time: end,
            total_duration_seconds: total,
        }
    }
}

/// Build phase evidence, including which image finally worked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildSection {
    pub success: bool,
    pub return_code: i32,
    pub duration_seconds: f64,
    pub image_used: String,
    pub attempt: ToolchainAttempt,
    /// 1-based matrix index, or 0 when the cached configuration was used.
    pub attempt_number: usize,
    pub from_cache: bool,
    /// Every image tried this run, in order, for diagnosability.
    pub images_tried: Vec<String>,
    pub classification: FailureClassification,
}

/// Artifact corroboration status after a reportedly successful build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Success,
    NoArtifacts,
    InsufficientArtifacts,
    NoClassFiles,
}

/// Filesystem evidence that the build actually compiled something.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactSection {
    pub artifacts_found: Vec<String>,
    pub artifact_count: usize,
    pub has_artifacts: bool,
    pub class_files: u32,
    pub jar_files: u32,
    pub war_files: u32,
    pub ear_files: u32,
    pub status: ArtifactStatus,
}

/// Aggregated JUnit-style test results across every parsed report file.
///
/// Merging per-directory partial aggregates in any order yields the same
/// totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestSuiteAggregate {
    pub total_tests: u32,
    pub passed_tests: u32,
    pub failed_tests: u32,
    pub skipped_tests: u32,
    pub execution_time_seconds: f64,
    pub failed_test_details: Vec<FailedTest>,
    pub reports_found: bool,
}

/// One failing testcase extracted from a report file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedTest {
    /// `classname.name` from the testcase element.
    pub test_name: String,
    pub failure_message: String,
}

impl TestSuiteAggregate {
    /// Fold another partial aggregate into this one.
    pub fn merge(&mut self, other: TestSuiteAggregate) {
        self.total_tests += other.total_tests;
        self.passed_tests += other.passed_tests;
        self.failed_tests += other.failed_tests;
        self.skipped_tests += other.skipped_tests;
        self.execution_time_seconds += other.execution_time_seconds;
        self.failed_test_details.extend(other.failed_test_details);
        self.reports_found = self.reports_found || other.reports_found;
    }

    /// passed/total, or 0.0 when no tests ran.
    pub fn success_rate(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            f64::from(self.passed_tests) / f64::from(self.total_tests)
        }
    }
}

/// How smoke tests were synthesized, when they were.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SmokeStrategy {
    SpringBoot,
    WebApp,
    CliMain,
    Library,
}

/// Evidence from the behavior-validation phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorSection {
    pub status: VerdictStatus,
    /// `test_execution` for discovered tests, `behavior_validation` for
    /// synthesized smoke tests.
    pub check_name: String,
    pub command_executed: Option<String>,
    pub return_code: i32,
    pub duration_seconds: f64,
    pub results: TestSuiteAggregate,
    pub success_rate: f64,
    pub smoke_strategy: Option<SmokeStrategy>,
    pub smoke_test_files: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Test-phase evidence for a legacy (caller-supplied) test command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestSection {
    pub command: String,
    pub return_code: i32,
    pub duration_seconds: f64,
}

/// Best-effort version probing results, diagnostics only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetectedVersions {
    pub java_version: Option<String>,
    pub build_tool_version: Option<String>,
}

/// The final, persisted verdict of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationSummary {
    pub run_id: Uuid,
    pub status: VerdictStatus,
    pub reason: String,
    pub detected_stack: Option<BuildStack>,
    pub java_file_count: usize,
    pub size_class: Option<SizeClass>,
    pub has_wrapper: bool,
    pub detected_versions: DetectedVersions,
    pub build: Option<BuildSection>,
    pub artifact_validation: Option<ArtifactSection>,
    pub legacy_test: Option<TestSection>,
    pub behavior_validation: Option<BehaviorSection>,
    pub timing: PhaseTiming,
}

impl VerificationSummary {
    /// Whether the run verdict accepts the candidate patch.
    pub fn passed(&self) -> bool {
        self.status == VerdictStatus::Pass
    }

    /// Persist the summary as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
