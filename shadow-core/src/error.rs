/*!
Error types for the shadow core engine.
*/

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the shadow core.
pub type Result<T> = std::result::Result<T, ShadowError>;

/// Errors that can occur during snapshot operations.
#[derive(Error, Debug)]
pub enum ShadowError {
    /// The file to snapshot does not exist
    #[error("file not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    /// The path has no entry in the metadata document
    #[error("file not tracked: {path}")]
    FileNotTracked { path: String },

    /// The path is tracked but has no version with this id
    #[error("version not found: {id} (file {path})")]
    VersionNotFound { path: String, id: String },

    /// A version is recorded but its blob is gone
    #[error("snapshot blob missing for version {id}: {}", .path.display())]
    SnapshotMissing { id: String, path: PathBuf },

    /// I/O failure with the failing step attached
    #[error("Storage error: {0}")]
    Storage(String),

    /// The metadata document exists but cannot be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),

    /// Another process holds the store lock
    #[error(
        "store is locked by another process: {} (remove it if no shadow process is running)",
        .path.display()
    )]
    Locked { path: PathBuf },

    /// Metadata document disagrees with itself
    #[error("Internal consistency error: {0}")]
    Inconsistent(String),

    /// Integrity check failures
    #[error("Integrity check failed: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ShadowError {
    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new internal consistency error
    pub fn inconsistent<S: Into<String>>(msg: S) -> Self {
        Self::Inconsistent(msg.into())
    }

    /// True for every "requested thing is absent" variant.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound { .. }
                | Self::FileNotTracked { .. }
                | Self::VersionNotFound { .. }
                | Self::SnapshotMissing { .. }
        )
    }
}
