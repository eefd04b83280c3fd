//! Staging of caller-supplied proof-of-vulnerability tests.
//!
//! Exploit-reproduction test files arrive from outside the project tree
//! and are copied under `src/test/java` before behavior validation so the
//! normal test run picks them up. Copying is best-effort per file; a
//! missing source file is reported, not fatal.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use javerify_core::Result;

/// Per-file outcome of one staging pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PovCopyStatus {
    /// Copied to the given project-relative path.
    Copied(String),
    /// Source file did not exist or was unreadable.
    Missing,
}

/// What happened to each requested test file, in input order.
#[derive(Debug, Clone, Default)]
pub struct PovCopyReport {
    pub entries: Vec<(PathBuf, PovCopyStatus)>,
}

impl PovCopyReport {
    pub fn copied_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, PovCopyStatus::Copied(_)))
            .count()
    }

    /// Project-relative paths of everything that landed in the tree.
    pub fn copied_files(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|(_, s)| match s {
                PovCopyStatus::Copied(rel) => Some(rel.clone()),
                PovCopyStatus::Missing => None,
            })
            .collect()
    }
}

/// Copy the given test files into the project's test sources.
///
/// Files already under the project root keep their relative location;
/// external files land in `src/test/java` by filename.
pub fn copy_pov_tests(project_path: &Path, pov_files: &[PathBuf]) -> Result<PovCopyReport> {
    let mut report = PovCopyReport::default();

    for source in pov_files {
        if !source.is_file() {
            warn!(file = %source.display(), "proof-of-vulnerability test not found");
            report
                .entries
                .push((source.clone(), PovCopyStatus::Missing));
            continue;
        }

        let rel = match source.strip_prefix(project_path) {
            // Already inside the tree, nothing to copy.
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                let name = source
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("PovTest.java"));
                let rel = Path::new("src/test/java").join(name);
                let dest = project_path.join(&rel);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(source, &dest)?;
                rel
            }
        };

        let rel_str = rel.to_string_lossy().to_string();
        info!(file = %rel_str, "staged proof-of-vulnerability test");
        report
            .entries
            .push((source.clone(), PovCopyStatus::Copied(rel_str)));
    }

    Ok(report)
}
