//! Per-project toolchain configuration cache.
//!
//! One JSON file per project under the cache directory, holding the last
//! toolchain attempt that produced a successful build (and validated
//! tests, when a test command was supplied). Created or overwritten only
//! on success. There is no file locking: concurrent runs against the same
//! project identifier are unsupported by contract, last write wins.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use javerify_core::ToolchainAttempt;

/// Filesystem-backed cache of known-good toolchain configurations.
#[derive(Debug, Clone)]
pub struct ToolchainCache {
    cache_dir: PathBuf,
}

impl ToolchainCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Normalize a project directory name into a filesystem-safe key.
    pub fn project_identifier(project_path: &Path) -> String {
        let name = project_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());

        name.to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    }

    fn entry_path(&self, project_identifier: &str) -> PathBuf {
        self.cache_dir.join(format!("{project_identifier}.json"))
    }

    /// Load the cached configuration, if any. An unreadable or corrupt
    /// entry behaves like a miss.
    pub fn load(&self, project_identifier: &str) -> Option<ToolchainAttempt> {
        let path = self.entry_path(project_identifier);
        let raw = std::fs::read_to_string(&path).ok()?;

        match serde_json::from_str(&raw) {
            Ok(attempt) => {
                debug!(project = project_identifier, "toolchain cache hit");
                Some(attempt)
            }
            Err(e) => {
                warn!(project = project_identifier, error = %e, "discarding corrupt cache entry");
                None
            }
        }
    }

    /// Persist a known-good configuration, overwriting any prior entry.
    /// Cache write failures are logged, never fatal.
    pub fn store(&self, project_identifier: &str, attempt: &ToolchainAttempt) {
        if let Err(e) = std::fs::create_dir_all(&self.cache_dir) {
            warn!(error = %e, "could not create cache directory");
            return;
        }

        match serde_json::to_string_pretty(attempt) {
            Ok(json) => {
                if let Err(e) = std::fs::write(self.entry_path(project_identifier), json) {
                    warn!(project = project_identifier, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(error = %e, "cache serialization failed"),
        }
    }
}
