//! Javerify Core Library
//!
//! Domain model for the patch verification build engine: build stacks and
//! their toolchain attempt matrices, failure classification, verdicts, and
//! the run-summary document handed to downstream decision-makers.

pub mod classify;
pub mod error;
pub mod stack;
pub mod telemetry;
pub mod verdict;

pub use classify::{classify, FailureClassification, FailureKind, RemediationAction};
pub use error::{Result, VerifyError};
pub use stack::{BuildStack, SizeClass, StackProfile, ToolchainAttempt};
pub use telemetry::init_tracing;
pub use verdict::{
    ArtifactSection, ArtifactStatus, BehaviorSection, BuildSection, DetectedVersions, FailedTest,
    PhaseTiming, SmokeStrategy, TestSection, TestSuiteAggregate, VerdictStatus,
    VerificationSummary,
};
