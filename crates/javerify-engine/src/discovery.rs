//! Discovery of existing test suites.
//!
//! Finds test sources by canonical directory and filename convention,
//! then infers the test framework by scoring import and annotation
//! indicators across a small sample of the files found.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use javerify_core::BuildStack;

/// How many discovered files are read when inferring the framework.
const FRAMEWORK_SAMPLE: usize = 5;

/// What test discovery found in a project tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDiscovery {
    /// Test source files, relative to the project root, sorted.
    pub test_files: Vec<String>,
    /// Directories that contained at least one test file, sorted.
    pub test_dirs: Vec<String>,
    /// Inferred framework identifier: `junit5`, `junit4`, `testng` or
    /// `spock`.
    pub framework: String,
    /// Score share of the winning framework, 0.0 when nothing matched.
    pub confidence: f64,
    /// Candidate test commands for the stack, wrapper variant first when
    /// the project has one.
    pub test_commands: Vec<String>,
}

impl TestDiscovery {
    pub fn has_tests(&self) -> bool {
        !self.test_files.is_empty()
    }
}

/// Canonical test roots for the stack, most common first.
fn canonical_test_dirs(stack: BuildStack) -> &'static [&'static str] {
    match stack {
        BuildStack::Maven => &["src/test/java", "src/it/java"],
        BuildStack::Gradle => &[
            "src/test/java",
            "src/integrationTest/java",
            "src/functionalTest/java",
        ],
        BuildStack::Javac => &["src/test/java", "test", "tests"],
    }
}

fn is_test_filename(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".java") else {
        return false;
    };
    stem.ends_with("Test") || stem.ends_with("Tests") || stem.ends_with("IT") || stem.starts_with("Test")
}

fn is_excluded(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("target" | "build" | "out" | ".git")
        )
    })
}

/// Scan a project tree for test sources and infer their framework.
pub fn discover_tests(project_path: &Path, stack: BuildStack, has_wrapper: bool) -> TestDiscovery {
    let mut files = BTreeSet::new();

    // Canonical roots first: everything ending in .java under them is a
    // test source regardless of its name.
    for dir in canonical_test_dirs(stack) {
        let base = project_path.join(dir);
        if !base.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&base)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("java") {
                files.insert(entry.path().to_path_buf());
            }
        }
    }

    // Then conventionally-named files anywhere outside build output.
    for entry in WalkDir::new(project_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let rel = path.strip_prefix(project_path).unwrap_or(path);
        if is_excluded(rel) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if is_test_filename(name) {
                files.insert(path.to_path_buf());
            }
        }
    }

    let (framework, confidence) = infer_framework(&files);

    let mut dirs = BTreeSet::new();
    let mut test_files = Vec::new();
    for path in &files {
        let rel = path.strip_prefix(project_path).unwrap_or(path);
        test_files.push(rel.to_string_lossy().to_string());
        if let Some(parent) = rel.parent() {
            dirs.insert(parent.to_string_lossy().to_string());
        }
    }

    let test_commands = test_commands_for(stack, has_wrapper);

    debug!(
        files = test_files.len(),
        framework, confidence, "test discovery complete"
    );

    TestDiscovery {
        test_files,
        test_dirs: dirs.into_iter().collect(),
        framework,
        confidence,
        test_commands,
    }
}

fn test_commands_for(stack: BuildStack, has_wrapper: bool) -> Vec<String> {
    let all = stack.test_commands();
    if all.is_empty() {
        return Vec::new();
    }
    // Command lists are ordered wrapper-first; keep only the applicable
    // variant at the front, the plain tool as fallback.
    let mut commands: Vec<String> = all.iter().map(|c| c.to_string()).collect();
    if !has_wrapper {
        commands.retain(|c| !c.starts_with("./"));
    }
    commands
}

/// Indicator substrings per framework. Import lines weigh the same as
/// annotations; the sample is small enough that refinement never paid off.
const FRAMEWORK_INDICATORS: &[(&str, &[&str])] = &[
    (
        "junit5",
        &[
            "org.junit.jupiter",
            "@BeforeEach",
            "@AfterEach",
            "@ParameterizedTest",
            "@DisplayName",
        ],
    ),
    (
        "junit4",
        &[
            "import org.junit.Test",
            "import org.junit.Before",
            "import org.junit.After",
            "@RunWith",
            "org.junit.Assert",
        ],
    ),
    (
        "testng",
        &["org.testng", "@BeforeMethod", "@AfterMethod", "@DataProvider"],
    ),
    (
        "spock",
        &["spock.lang", "extends Specification", "@Unroll"],
    ),
];

fn infer_framework(files: &BTreeSet<PathBuf>) -> (String, f64) {
    let mut scores: Vec<(&str, u32)> = FRAMEWORK_INDICATORS
        .iter()
        .map(|(name, _)| (*name, 0u32))
        .collect();

    for path in files.iter().take(FRAMEWORK_SAMPLE) {
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        for (i, (_, indicators)) in FRAMEWORK_INDICATORS.iter().enumerate() {
            for indicator in *indicators {
                if content.contains(indicator) {
                    scores[i].1 += 1;
                }
            }
        }
    }

    let total: u32 = scores.iter().map(|(_, s)| s).sum();
    if total == 0 {
        return ("junit5".to_string(), 0.0);
    }

    let (best, score) = scores
        .iter()
        .max_by_key(|(_, s)| *s)
        .copied()
        .unwrap_or(("junit5", 0));
    (best.to_string(), f64::from(score) / f64::from(total))
}
