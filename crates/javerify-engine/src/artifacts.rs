//! Artifact corroboration after a reportedly successful build.
//!
//! A zero exit code from a build tool is not proof that anything was
//! compiled. This pass walks the stack's output directories and counts
//! what actually landed on disk before the verdict trusts the build.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use javerify_core::{ArtifactSection, ArtifactStatus, BuildStack};

/// Output directories searched per stack, relative to the project root.
fn output_roots(stack: BuildStack) -> &'static [&'static str] {
    match stack {
        BuildStack::Maven => &["target"],
        BuildStack::Gradle => &["build"],
        BuildStack::Javac => &["out", "."],
    }
}

/// Inspect the project tree for build outputs and judge whether they
/// corroborate a successful compilation.
///
/// Any file under a stack output directory counts as evidence that the
/// build ran, but only compiled classes or packaged archives count as
/// proof that it compiled something.
pub fn validate_artifacts(project_path: &Path, stack: BuildStack) -> ArtifactSection {
    let mut found = Vec::new();
    let mut class_files = 0u32;
    let mut jar_files = 0u32;
    let mut war_files = 0u32;
    let mut ear_files = 0u32;

    for root in output_roots(stack) {
        let base = project_path.join(root);
        if !base.is_dir() {
            continue;
        }

        // Javac's "." root only picks up loose class files in the project
        // top level, not arbitrary source-tree contents.
        let top_level_classes_only = stack == BuildStack::Javac && *root == ".";
        let max_depth = if top_level_classes_only { 1 } else { usize::MAX };

        for entry in WalkDir::new(&base)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());

            if top_level_classes_only && ext != Some("class") {
                continue;
            }

            match ext {
                Some("class") => class_files += 1,
                Some("jar") => jar_files += 1,
                Some("war") => war_files += 1,
                Some("ear") => ear_files += 1,
                _ => {}
            }

            let rel = path
                .strip_prefix(project_path)
                .unwrap_or(path)
                .to_string_lossy()
                .to_string();
            if !found.contains(&rel) {
                found.push(rel);
            }
        }
    }

    let packaged = jar_files + war_files + ear_files;
    let status = if found.is_empty() {
        ArtifactStatus::NoArtifacts
    } else {
        match stack {
            BuildStack::Maven | BuildStack::Gradle => {
                if class_files > 0 || packaged > 0 {
                    ArtifactStatus::Success
                } else {
                    ArtifactStatus::InsufficientArtifacts
                }
            }
            // Bare javac only ever produces class files.
            BuildStack::Javac => {
                if class_files > 0 {
                    ArtifactStatus::Success
                } else {
                    ArtifactStatus::NoClassFiles
                }
            }
        }
    };

    debug!(
        artifacts = found.len(),
        class_files, jar_files, ?status, "artifact validation"
    );

    ArtifactSection {
        artifact_count: found.len(),
        has_artifacts: !found.is_empty(),
        artifacts_found: found,
        class_files,
        jar_files,
        war_files,
        ear_files,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, b"").expect("write");
    }

    #[test]
    fn test_maven_classes_and_jar_succeed() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("target/classes/com/example/App.class"));
        touch(&dir.path().join("target/classes/com/example/Util.class"));
        touch(&dir.path().join("target/app-1.0.jar"));

        let section = validate_artifacts(dir.path(), BuildStack::Maven);
        assert_eq!(section.status, ArtifactStatus::Success);
        assert_eq!(section.class_files, 2);
        assert_eq!(section.jar_files, 1);
        assert_eq!(section.artifact_count, 3);
        assert!(section.has_artifacts);
    }

    #[test]
    fn test_empty_target_is_no_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("target")).expect("mkdir");

        let section = validate_artifacts(dir.path(), BuildStack::Maven);
        assert_eq!(section.status, ArtifactStatus::NoArtifacts);
        assert!(!section.has_artifacts);
    }

    #[test]
    fn test_missing_output_dir_is_no_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let section = validate_artifacts(dir.path(), BuildStack::Gradle);
        assert_eq!(section.status, ArtifactStatus::NoArtifacts);
    }

    #[test]
    fn test_metadata_only_target_is_insufficient() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The build ran far enough to leave metadata but compiled nothing.
        touch(&dir.path().join("target/maven-status/createdFiles.lst"));

        let section = validate_artifacts(dir.path(), BuildStack::Maven);
        assert_eq!(section.status, ArtifactStatus::InsufficientArtifacts);
        assert!(section.has_artifacts);
        assert_eq!(section.class_files, 0);
    }

    #[test]
    fn test_gradle_build_dir_is_searched() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("build/classes/java/main/App.class"));
        touch(&dir.path().join("build/libs/app.jar"));

        let section = validate_artifacts(dir.path(), BuildStack::Gradle);
        assert_eq!(section.status, ArtifactStatus::Success);
        assert_eq!(section.class_files, 1);
        assert_eq!(section.jar_files, 1);
    }

    #[test]
    fn test_javac_without_class_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A jar in out/ does not count for a bare javac build.
        touch(&dir.path().join("out/bundled.jar"));

        let section = validate_artifacts(dir.path(), BuildStack::Javac);
        assert_eq!(section.status, ArtifactStatus::NoClassFiles);
    }

    #[test]
    fn test_javac_loose_class_files_at_top_level() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("Main.class"));

        let section = validate_artifacts(dir.path(), BuildStack::Javac);
        assert_eq!(section.status, ArtifactStatus::Success);
        assert_eq!(section.class_files, 1);
    }

    #[test]
    fn test_javac_top_level_scan_skips_sources() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("Main.java"));
        touch(&dir.path().join("src/deep/Hidden.class"));

        let section = validate_artifacts(dir.path(), BuildStack::Javac);
        assert_eq!(section.status, ArtifactStatus::NoArtifacts);
    }

    #[test]
    fn test_war_and_ear_are_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("target/app.war"));
        touch(&dir.path().join("target/enterprise.ear"));

        let section = validate_artifacts(dir.path(), BuildStack::Maven);
        assert_eq!(section.war_files, 1);
        assert_eq!(section.ear_files, 1);
        assert_eq!(section.status, ArtifactStatus::Success);
    }
}
