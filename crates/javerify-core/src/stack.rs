//! Build stacks, command templates, and toolchain attempt matrices.
//!
//! A [`BuildStack`] is a closed enum so adding a new build system is a
//! compile-time-checked exercise. The per-stack [`StackProfile`] and the
//! ordered [`ToolchainAttempt`] matrices are plain immutable data built
//! once at startup; the matrices are priority lists, not sets — they are
//! ordered by observed success likelihood for legacy Java corpora (JDK 8
//! images first for Maven and javac).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A detected Java build system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BuildStack {
    Maven,
    Gradle,
    Javac,
}

impl BuildStack {
    /// Stable lowercase name used in summaries and cache files.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStack::Maven => "maven",
            BuildStack::Gradle => "gradle",
            BuildStack::Javac => "javac",
        }
    }

    /// Command templates for this stack.
    pub fn profile(&self) -> StackProfile {
        match self {
            BuildStack::Maven => StackProfile {
                stack: *self,
                build_cmd_with_wrapper: "./mvnw clean compile -B",
                build_cmd_without_wrapper: "mvn clean compile -B",
                test_cmd_with_wrapper: Some("./mvnw test -B"),
                test_cmd_without_wrapper: Some("mvn test -B"),
            },
            BuildStack::Gradle => StackProfile {
                stack: *self,
                build_cmd_with_wrapper: "./gradlew build --no-daemon",
                build_cmd_without_wrapper: "gradle build --no-daemon",
                test_cmd_with_wrapper: Some("./gradlew test --no-daemon"),
                test_cmd_without_wrapper: Some("gradle test --no-daemon"),
            },
            // Plain javac has no wrapper and no test runner.
            BuildStack::Javac => StackProfile {
                stack: *self,
                build_cmd_with_wrapper: "javac *.java && mkdir -p out && mv *.class out/",
                build_cmd_without_wrapper: "javac *.java && mkdir -p out && mv *.class out/",
                test_cmd_with_wrapper: None,
                test_cmd_without_wrapper: None,
            },
        }
    }

    /// Ordered toolchain attempts for this stack.
    ///
    /// Multi-arch images only (x86-64 and ARM64). The ordering encodes
    /// which JDK/tool combinations most often build CVE-era Java projects.
    pub fn attempts(&self) -> Vec<ToolchainAttempt> {
        match self {
            BuildStack::Maven => vec![
                ToolchainAttempt::new("maven:3.9-eclipse-temurin-8", "8", "3.9"),
                ToolchainAttempt::new("maven:3.9-eclipse-temurin-17", "17", "3.9"),
                ToolchainAttempt::new("maven:3.8-openjdk-11", "11", "3.8"),
                ToolchainAttempt::new("maven:3.8-eclipse-temurin-8", "8", "3.8"),
                ToolchainAttempt::new("maven:3.8-eclipse-temurin-17", "17", "3.8"),
                ToolchainAttempt::new("maven:3.9-eclipse-temurin-21", "21", "3.9"),
            ],
            BuildStack::Gradle => vec![
                ToolchainAttempt::new("gradle:8-jdk8", "8", "8"),
                ToolchainAttempt::new("gradle:8-jdk17", "17", "8"),
                ToolchainAttempt::new("gradle:8-jdk11", "11", "8"),
                ToolchainAttempt::new("gradle:7-jdk11", "11", "7"),
                ToolchainAttempt::new("gradle:8-jdk21", "21", "8"),
            ],
            BuildStack::Javac => vec![
                ToolchainAttempt::new("eclipse-temurin:8-jdk", "8", "n/a"),
                ToolchainAttempt::new("eclipse-temurin:17-jdk", "17", "n/a"),
                ToolchainAttempt::new("eclipse-temurin:11-jdk", "11", "n/a"),
                ToolchainAttempt::new("eclipse-temurin:21-jdk", "21", "n/a"),
            ],
        }
    }

    /// Candidate test commands, wrapper variant first.
    pub fn test_commands(&self) -> Vec<&'static str> {
        match self {
            BuildStack::Maven => vec!["./mvnw test -B", "mvn test -B"],
            BuildStack::Gradle => vec!["./gradlew test --no-daemon", "gradle test --no-daemon"],
            BuildStack::Javac => {
                vec!["echo 'Tests not supported for javac projects without build system'"]
            }
        }
    }
}

impl fmt::Display for BuildStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command templates for one build stack. Immutable, defined at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackProfile {
    pub stack: BuildStack,
    pub build_cmd_with_wrapper: &'static str,
    pub build_cmd_without_wrapper: &'static str,
    pub test_cmd_with_wrapper: Option<&'static str>,
    pub test_cmd_without_wrapper: Option<&'static str>,
}

impl StackProfile {
    /// Build command for the given wrapper availability.
    pub fn build_command(&self, has_wrapper: bool) -> &'static str {
        if has_wrapper {
            self.build_cmd_with_wrapper
        } else {
            self.build_cmd_without_wrapper
        }
    }

    /// Test command for the given wrapper availability, if the stack has one.
    pub fn test_command(&self, has_wrapper: bool) -> Option<&'static str> {
        if has_wrapper {
            self.test_cmd_with_wrapper
        } else {
            self.test_cmd_without_wrapper
        }
    }
}

/// One container image / JDK / build-tool combination from the retry matrix.
///
/// The serde field names are the on-disk cache schema and must stay stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolchainAttempt {
    /// Container image reference.
    pub image: String,

    /// Java runtime major version inside the image.
    pub jdk: String,

    /// Build tool version, or "n/a" for plain javac images.
    pub tool: String,
}

impl ToolchainAttempt {
    pub fn new(image: &str, jdk: &str, tool: &str) -> Self {
        Self {
            image: image.to_string(),
            jdk: jdk.to_string(),
            tool: tool.to_string(),
        }
    }
}

/// Project size classification, diagnostics only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    SingleFile,
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Fixed threshold table over the recursive `.java` file count.
    pub fn from_java_file_count(count: usize) -> Self {
        match count {
            1 => SizeClass::SingleFile,
            0..=10 => SizeClass::Small,
            11..=100 => SizeClass::Medium,
            _ => SizeClass::Large,
        }
    }
}
