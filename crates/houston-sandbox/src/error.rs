//! Error types for sandbox operations.
//!
//! Every variant is an infrastructure failure. A container that runs and
//! exits non-zero is not an error at this layer; callers turn exit codes
//! into report logs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The container runtime binary is missing or its daemon is unreachable.
    #[error("Container runtime unavailable: {message}\n\n{install_hint}")]
    Unavailable {
        message: String,
        install_hint: String,
    },

    /// The requested image has not been built.
    #[error("Image not found: {0}")]
    ImageMissing(String),

    /// Building an image failed.
    #[error("Failed to build image {image}: {output}")]
    BuildFailed { image: String, output: String },

    /// The runtime itself failed to start the container.
    #[error("Container execution failed: {0}")]
    ExecutionFailed(String),

    /// Build context directory does not exist.
    #[error("Build context not found: {}", .0.display())]
    ContextMissing(PathBuf),

    /// A run exceeded its configured deadline.
    #[error("Container timed out after {0:?}")]
    Timeout(Duration),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
