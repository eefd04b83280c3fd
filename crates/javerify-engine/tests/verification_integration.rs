//! End-to-end verification runs against a scripted execution backend.
//!
//! No container daemon is involved: the fake executor answers every run
//! with a fixed return code, and build artifacts / JUnit reports are laid
//! out on disk ahead of time, which is all the engine ever inspects.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use javerify_core::{VerdictStatus, VerifyError};
use javerify_engine::runner::{CommandExecutionResult, CommandExecutor};
use javerify_engine::{ToolchainCache, VerificationOrchestrator, VerifyOptions};

struct FixedExecutor {
    available: bool,
    return_code: i32,
    calls: Mutex<Vec<String>>,
}

impl FixedExecutor {
    fn new(return_code: i32) -> Self {
        Self {
            available: true,
            return_code,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            return_code: 0,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CommandExecutor for FixedExecutor {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn run(
        &self,
        _image: &str,
        command: &str,
        _work_dir: &Path,
        _artifacts_dir: &Path,
        _timeout: Duration,
    ) -> CommandExecutionResult {
        self.calls.lock().expect("lock").push(command.to_string());
        CommandExecutionResult {
            return_code: self.return_code,
            duration_seconds: 0.5,
            timed_out: false,
        }
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, content).expect("write");
}

fn passing_report(tests: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="com.example.AppTest" tests="{tests}" failures="0" errors="0" skipped="0" time="0.4"/>"#
    )
}

/// Maven project with compiled artifacts already in place.
fn maven_project(dir: &Path) {
    write(&dir.join("pom.xml"), "<project/>");
    write(
        &dir.join("src/main/java/com/example/App.java"),
        "package com.example;\npublic class App {}\n",
    );
    write(&dir.join("target/classes/com/example/App.class"), "");
}

fn orchestrator(executor: Arc<dyn CommandExecutor>, cache_dir: &Path) -> VerificationOrchestrator {
    VerificationOrchestrator::new(executor, ToolchainCache::new(cache_dir))
}

#[tokio::test]
async fn test_full_pass_with_existing_tests() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    maven_project(project.path());
    write(
        &project.path().join("src/test/java/com/example/AppTest.java"),
        "package com.example;\nimport org.junit.jupiter.api.Test;\nclass AppTest { @Test void ok() {} }\n",
    );
    write(
        &project
            .path()
            .join("target/surefire-reports/TEST-com.example.AppTest.xml"),
        &passing_report(4),
    );

    let executor = Arc::new(FixedExecutor::new(0));
    let orchestrator = orchestrator(executor.clone(), cache_dir.path());

    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await
        .expect("verify");

    assert_eq!(summary.status, VerdictStatus::Pass);
    assert!(summary.passed());

    let build = summary.build.expect("build section");
    assert!(build.success);
    assert_eq!(build.attempt_number, 1);
    assert_eq!(build.image_used, "maven:3.9-eclipse-temurin-8");

    let behavior = summary.behavior_validation.expect("behavior section");
    assert_eq!(behavior.check_name, "test_execution");
    assert_eq!(behavior.results.total_tests, 4);
    assert_eq!(behavior.results.failed_tests, 0);
    assert_eq!(behavior.success_rate, 1.0);

    // Winning config persisted for the next run against this project.
    let project_id = ToolchainCache::project_identifier(project.path());
    assert!(cache_dir.path().join(format!("{project_id}.json")).is_file());

    // Summary document written into the artifacts dir.
    let raw = std::fs::read_to_string(artifacts.path().join("verification_summary.json"))
        .expect("summary file");
    assert!(raw.contains("\"status\": \"PASS\""));

    // One build, one test run.
    let commands = executor.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0], "mvn clean compile -B");
    assert_eq!(commands[1], "mvn test -B");
}

#[tokio::test]
async fn test_retry_exhaustion_fails_with_all_images_recorded() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    maven_project(project.path());

    let executor = Arc::new(FixedExecutor::new(1));
    let orchestrator = orchestrator(executor, cache_dir.path());

    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await
        .expect("verify");

    assert_eq!(summary.status, VerdictStatus::Fail);
    let build = summary.build.expect("build section");
    assert!(!build.success);
    assert_eq!(build.attempt_number, 6);
    assert_eq!(build.images_tried.len(), 6);
    assert!(summary.reason.contains("build failed"));
    assert!(summary.behavior_validation.is_none());
}

#[tokio::test]
async fn test_successful_build_without_artifacts_fails() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    // pom.xml and sources, but nothing under target/.
    write(&project.path().join("pom.xml"), "<project/>");
    write(
        &project.path().join("src/main/java/App.java"),
        "public class App {}",
    );

    let executor = Arc::new(FixedExecutor::new(0));
    let orchestrator = orchestrator(executor, cache_dir.path());

    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await
        .expect("verify");

    assert_eq!(summary.status, VerdictStatus::Fail);
    assert!(summary.reason.contains("no artifacts"));
    let artifact_section = summary.artifact_validation.expect("artifact section");
    assert!(!artifact_section.has_artifacts);
}

#[tokio::test]
async fn test_failing_tests_fail_the_run() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    maven_project(project.path());
    write(
        &project.path().join("src/test/java/AppTest.java"),
        "import org.junit.jupiter.api.Test;\nclass AppTest { @Test void broken() {} }\n",
    );
    write(
        &project
            .path()
            .join("target/surefire-reports/TEST-com.example.AppTest.xml"),
        r#"<testsuite name="com.example.AppTest" tests="3" failures="1" errors="0" skipped="0" time="0.9">
  <testcase classname="com.example.AppTest" name="broken">
    <failure message="expected 2 but was 3"/>
  </testcase>
</testsuite>"#,
    );

    let executor = Arc::new(FixedExecutor::new(0));
    let orchestrator = orchestrator(executor, cache_dir.path());

    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await
        .expect("verify");

    assert_eq!(summary.status, VerdictStatus::Fail);
    let behavior = summary.behavior_validation.expect("behavior section");
    assert_eq!(behavior.status, VerdictStatus::Fail);
    assert_eq!(behavior.results.failed_tests, 1);
    assert_eq!(
        behavior.results.failed_test_details[0].test_name,
        "com.example.AppTest.broken"
    );
}

#[tokio::test]
async fn test_smoke_path_passes_and_cleans_up() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    // No test sources: a CLI main class triggers smoke synthesis.
    write(&project.path().join("pom.xml"), "<project/>");
    write(
        &project.path().join("src/main/java/com/example/Tool.java"),
        "package com.example;\npublic class Tool { public static void main(String[] args) {} }\n",
    );
    write(&project.path().join("target/classes/com/example/Tool.class"), "");
    write(
        &project
            .path()
            .join("target/surefire-reports/TEST-generated.GeneratedCliSmokeTest1.xml"),
        &passing_report(2),
    );

    let executor = Arc::new(FixedExecutor::new(0));
    let orchestrator = orchestrator(executor, cache_dir.path());

    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await
        .expect("verify");

    assert_eq!(summary.status, VerdictStatus::Pass);
    let behavior = summary.behavior_validation.expect("behavior section");
    assert_eq!(behavior.check_name, "behavior_validation");
    assert_eq!(
        behavior.smoke_strategy,
        Some(javerify_core::SmokeStrategy::CliMain)
    );
    assert!(!behavior.smoke_test_files.is_empty());

    // Synthesized sources are gone after the run.
    assert!(!project.path().join("src/test/java/generated").exists());
}

#[tokio::test]
async fn test_detection_failure_is_a_fail_verdict() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    // Empty directory: no build descriptor, no sources.
    let executor = Arc::new(FixedExecutor::new(0));
    let orchestrator = orchestrator(executor.clone(), cache_dir.path());

    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await
        .expect("verify");

    assert_eq!(summary.status, VerdictStatus::Fail);
    assert!(summary.reason.contains("detection failed"));
    assert_eq!(summary.detected_stack, None);
    assert!(executor.commands().is_empty());
}

#[tokio::test]
async fn test_unavailable_backend_is_fatal() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");

    let executor = Arc::new(FixedExecutor::unavailable());
    let orchestrator = orchestrator(executor, cache_dir.path());

    let result = orchestrator
        .verify(project.path(), artifacts.path(), &VerifyOptions::default())
        .await;

    assert!(matches!(result, Err(VerifyError::BackendUnavailable(_))));
}

#[tokio::test]
async fn test_pov_files_are_staged_before_discovery() {
    let project = tempfile::tempdir().expect("project");
    let artifacts = tempfile::tempdir().expect("artifacts");
    let cache_dir = tempfile::tempdir().expect("cache");
    let external = tempfile::tempdir().expect("external");

    maven_project(project.path());
    write(
        &project.path().join("target/surefire-reports/TEST-generated.xml"),
        &passing_report(1),
    );

    let pov = external.path().join("ExploitTest.java");
    write(
        &pov,
        "import org.junit.jupiter.api.Test;\nclass ExploitTest { @Test void fixed() {} }\n",
    );

    let executor = Arc::new(FixedExecutor::new(0));
    let orchestrator = orchestrator(executor, cache_dir.path());

    let options = VerifyOptions {
        pov_files: vec![PathBuf::from(&pov)],
        ..VerifyOptions::default()
    };
    let summary = orchestrator
        .verify(project.path(), artifacts.path(), &options)
        .await
        .expect("verify");

    // The staged file made discovery see an existing test suite.
    assert!(project
        .path()
        .join("src/test/java/ExploitTest.java")
        .is_file());
    let behavior = summary.behavior_validation.expect("behavior section");
    assert_eq!(behavior.check_name, "test_execution");
    assert_eq!(summary.status, VerdictStatus::Pass);
}
