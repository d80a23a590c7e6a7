//! CLI error type.

use thiserror::Error;
use tickshift_core::CoreError;
use tickshift_storage::StorageError;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the CLI before exiting with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failure in the transform core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Failure reading a state file directly.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Report serialization failed.
    #[error("cannot render report: {0}")]
    Json(#[from] serde_json::Error),

    /// Arguments are missing or inconsistent.
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Short error kind printed before the details.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Core(e) => e.kind(),
            Self::Storage(_) => "StorageError",
            Self::Json(_) => "OutputError",
            Self::Usage(_) => "UsageError",
        }
    }
}
