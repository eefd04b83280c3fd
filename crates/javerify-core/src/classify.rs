//! Build failure classification.
//!
//! A pure, total lookup over the process return code. The two reserved
//! codes come from the container runner: 124 means the wall-clock timeout
//! expired, 125 means the isolation layer itself failed to run the
//! command. Everything the classifier knows is in the table below;
//! project type never influences the result.

use serde::{Deserialize, Serialize};

/// Failure category derived from a return code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Success,
    CompilationError,
    MissingDependencies,
    Timeout,
    DockerError,
    UnknownFailure,
}

/// Suggested next step for a classified failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    Continue,
    Stop,
    InstallDependencies,
    RetryWithLongerTimeout,
    CheckDockerSetup,
    Investigate,
}

/// Classification of one build invocation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureClassification {
    pub return_code: i32,
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub action: RemediationAction,
    pub reason: String,
}

/// Classify a build return code.
pub fn classify(return_code: i32) -> FailureClassification {
    let (kind, action, reason) = match return_code {
        0 => (
            FailureKind::Success,
            RemediationAction::Continue,
            "Build completed successfully".to_string(),
        ),
        1 => (
            FailureKind::CompilationError,
            RemediationAction::Stop,
            "Compilation or build script failure".to_string(),
        ),
        2 => (
            FailureKind::MissingDependencies,
            RemediationAction::InstallDependencies,
            "Missing build dependencies".to_string(),
        ),
        124 => (
            FailureKind::Timeout,
            RemediationAction::RetryWithLongerTimeout,
            "Build exceeded time limit".to_string(),
        ),
        125 => (
            FailureKind::DockerError,
            RemediationAction::CheckDockerSetup,
            "Container execution error".to_string(),
        ),
        rc => (
            FailureKind::UnknownFailure,
            RemediationAction::Investigate,
            format!("Build failed with exit code {rc}"),
        ),
    };

    FailureClassification {
        return_code,
        kind,
        action,
        reason,
    }
}
