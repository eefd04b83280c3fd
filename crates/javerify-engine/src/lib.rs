//! Javerify Engine
//!
//! The patch-verification build engine: detects a Java project's build
//! stack, builds it inside disposable containers with a toolchain retry
//! matrix, corroborates the build with artifact checks, and validates
//! behavior through existing tests or synthesized smoke tests.

pub mod artifacts;
pub mod cache;
pub mod detector;
pub mod discovery;
pub mod orchestrator;
pub mod pov;
pub mod reports;
pub mod retry;
pub mod runner;
pub mod smoke;
pub mod versions;

pub use artifacts::validate_artifacts;
pub use cache::ToolchainCache;
pub use detector::{detect_project, ProjectProfile};
pub use discovery::{discover_tests, TestDiscovery};
pub use orchestrator::{VerificationOrchestrator, VerifyOptions};
pub use pov::{copy_pov_tests, PovCopyReport};
pub use reports::aggregate_reports;
pub use retry::{BuildOutcome, BuildRetryStrategist};
pub use runner::{CommandExecutionResult, CommandExecutor, ContainerRunner};
pub use smoke::{SmokeGeneration, SmokeTestSynthesizer};
pub use versions::detect_versions;
