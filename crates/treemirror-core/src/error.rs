//! Error types for synchronization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SyncConfigBuilderError;

/// Fatal errors that abort a whole pass.
///
/// Per-entry problems are never raised as `SyncError`; they are collected
/// as [`SyncFailure`] records instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Source root does not exist.
    #[error("Source directory does not exist: {path}")]
    SourceMissing { path: PathBuf },

    /// Source root is not a directory.
    #[error("Source is not a directory: {path}")]
    SourceNotADirectory { path: PathBuf },

    /// Destination root exists but is not a directory.
    #[error("Destination is not a directory: {path}")]
    DestinationNotADirectory { path: PathBuf },

    /// Destination root could not be created.
    #[error("Failed to create destination {path}: {source}")]
    DestinationCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source and destination are the same tree or nest inside each other.
    #[error("Source {source_root} and destination {destination} overlap")]
    OverlappingRoots {
        source_root: PathBuf,
        destination: PathBuf,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic I/O error on a root path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Create an I/O error for a source root with path context.
    pub fn source_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::SourceMissing { path },
            _ => Self::Io { path, source },
        }
    }
}

impl From<SyncConfigBuilderError> for SyncError {
    fn from(err: SyncConfigBuilderError) -> Self {
        Self::InvalidConfig {
            message: err.to_string(),
        }
    }
}

/// The operation that failed for a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum FailedOperation {
    /// Copying a source-only entry.
    Create,
    /// Overwriting a changed file.
    Update,
    /// Removing a destination entry.
    Delete,
    /// Hashing during the integrity check.
    Hash,
    /// Listing a directory.
    List,
    /// Reading entry metadata.
    Inspect,
}

/// Non-fatal failure on one entry; siblings are still processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    /// Path where the failure occurred.
    pub path: PathBuf,
    /// What was being attempted.
    pub operation: FailedOperation,
    /// Human-readable message.
    pub message: String,
}

impl SyncFailure {
    /// Create a new failure record.
    pub fn new(
        path: impl Into<PathBuf>,
        operation: FailedOperation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            operation,
            message: message.into(),
        }
    }

    /// Create a failure record from an I/O error.
    pub fn io(path: impl Into<PathBuf>, operation: FailedOperation, error: &std::io::Error) -> Self {
        Self::new(path, operation, error.to_string())
    }
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed for {}: {}",
            self.operation,
            self.path.display(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_io_not_found() {
        let err = SyncError::source_io(
            "/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SyncError::SourceMissing { .. }));
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_source_io_other() {
        let err = SyncError::source_io(
            "/denied",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[test]
    fn test_builder_error_is_invalid_config() {
        let err: SyncError = crate::SyncConfig::builder()
            .source("/data/a")
            .destination("/data/a")
            .build()
            .unwrap_err()
            .into();
        assert!(matches!(err, SyncError::InvalidConfig { .. }));
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_failure_display() {
        let failure = SyncFailure::new("/dst/a.txt", FailedOperation::Delete, "busy");
        assert_eq!(failure.to_string(), "Delete failed for /dst/a.txt: busy");
    }
}
