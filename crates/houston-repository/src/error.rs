//! Error types for repository adapters.

use thiserror::Error;

/// Errors raised by repository adapters.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Clone failed: {0}")]
    CloneFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// Result type for repository operations.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
