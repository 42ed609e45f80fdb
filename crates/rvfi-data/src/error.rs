//! Error types for dataset loading.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataset operations.
///
/// Per-sample errors ([`DataError::CorruptFrame`]) are isolated by the
/// datasets (logged and skipped); missing lists or roots surface to the
/// caller.
#[derive(Error, Debug)]
pub enum DataError {
    /// A required file or directory is absent.
    #[error("Missing resource: {0}")]
    MissingResource(String),

    /// An image file failed to decode.
    #[error("Corrupt frame {path}: {reason}")]
    CorruptFrame { path: PathBuf, reason: String },

    /// A split list contained no usable entries.
    #[error("Empty split list: {0}")]
    EmptySplit(String),

    /// A split list or dataset layout is structurally wrong.
    #[error("Malformed dataset: {0}")]
    Malformed(String),
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// Create a missing resource error.
    pub fn missing_resource(msg: impl Into<String>) -> Self {
        Self::MissingResource(msg.into())
    }

    /// Create a corrupt frame error.
    pub fn corrupt_frame(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptFrame {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed dataset error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
