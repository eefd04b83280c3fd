//! Java project detection.
//!
//! Build descriptors win over raw source files: `pom.xml` marks Maven,
//! `build.gradle`/`build.gradle.kts` mark Gradle, and any remaining
//! `.java` files fall back to plain javac. A directory with neither a
//! descriptor nor sources is the single unconditionally fatal detection
//! case.

use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use javerify_core::{BuildStack, Result, SizeClass, VerifyError};

/// Detection result for one project directory. Derived fresh per run from
/// the filesystem, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectProfile {
    pub stack: BuildStack,
    pub java_file_count: usize,
    pub size_class: SizeClass,
    pub has_wrapper: bool,
}

impl ProjectProfile {
    /// Wrapper-aware build command for this project.
    pub fn build_command(&self) -> &'static str {
        self.stack.profile().build_command(self.has_wrapper)
    }

    /// Wrapper-aware test command, if the stack supports one.
    pub fn test_command(&self) -> Option<&'static str> {
        self.stack.profile().test_command(self.has_wrapper)
    }
}

/// Inspect a project directory and determine its build stack.
pub fn detect_project(project_path: &Path) -> Result<ProjectProfile> {
    if !project_path.is_dir() {
        return Err(VerifyError::InvalidProjectPath(
            project_path.display().to_string(),
        ));
    }

    let java_file_count = count_java_files(project_path);

    let (stack, has_wrapper) = if has_any(project_path, &["pom.xml"]) {
        (
            BuildStack::Maven,
            has_any(project_path, &["mvnw", "mvnw.cmd"]),
        )
    } else if has_any(project_path, &["build.gradle", "build.gradle.kts"]) {
        (
            BuildStack::Gradle,
            has_any(project_path, &["gradlew", "gradlew.bat"]),
        )
    } else if java_file_count > 0 {
        (BuildStack::Javac, false)
    } else {
        return Err(VerifyError::Detection(
            "no Java files or recognized build system found".to_string(),
        ));
    };

    debug!(
        stack = %stack,
        java_files = java_file_count,
        has_wrapper,
        "detected project"
    );

    Ok(ProjectProfile {
        stack,
        java_file_count,
        size_class: SizeClass::from_java_file_count(java_file_count),
        has_wrapper,
    })
}

fn has_any(project_path: &Path, names: &[&str]) -> bool {
    names.iter().any(|name| project_path.join(name).exists())
}

/// Count `.java` sources recursively, unreadable entries skipped.
pub fn count_java_files(project_path: &Path) -> usize {
    WalkDir::new(project_path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("java"))
        })
        .count()
}
