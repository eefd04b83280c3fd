//! Domain-level error taxonomy for Javerify.
//!
//! Only the fatal preconditions surface as errors; everything that can go
//! wrong inside a verification run (a failed build attempt, an unparseable
//! report file) is absorbed into result types instead.

/// Javerify domain errors.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("container backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("project detection failed: {0}")]
    Detection(String),

    #[error("invalid project path: {0}")]
    InvalidProjectPath(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Javerify domain operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
