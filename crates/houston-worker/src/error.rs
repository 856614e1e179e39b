//! Error types for the worker.
//!
//! Two tiers: [`TaskError::Log`] carries an expected, reportable condition;
//! [`TaskError::Fatal`] carries a [`WorkerError`] that aborts the run.

use houston_repository::RepositoryError;
use houston_sandbox::SandboxError;
use houston_types::{Log, TypesError};
use thiserror::Error;

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Result type for task bodies.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Infrastructure failures. These propagate through every composite.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The context names nothing to build.
    #[error("Context has no references")]
    NoReferences,

    /// A task needed the workspace before setup.
    #[error("Workspace is not set up")]
    NoWorkspace,

    /// Workspace setup reported an expected failure.
    #[error("Workspace setup failed: {0}")]
    Setup(String),

    /// The repository adapter cannot clone.
    #[error("Repository {0} does not offer source control")]
    NoSourceControl(String),

    /// Task name not present in the registry.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Template error: {0}")]
    Template(#[from] TypesError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Expected failure, caught by the nearest composite and reported.
    #[error("{0}")]
    Log(Log),

    /// Unrecoverable failure, propagated to the worker's caller.
    #[error(transparent)]
    Fatal(#[from] WorkerError),
}

impl TaskError {
    pub fn is_log(&self) -> bool {
        matches!(self, TaskError::Log(_))
    }
}

impl From<Log> for TaskError {
    fn from(log: Log) -> Self {
        TaskError::Log(log)
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::Fatal(err.into())
    }
}

impl From<SandboxError> for TaskError {
    fn from(err: SandboxError) -> Self {
        TaskError::Fatal(err.into())
    }
}

impl From<RepositoryError> for TaskError {
    fn from(err: RepositoryError) -> Self {
        TaskError::Fatal(err.into())
    }
}

impl From<TypesError> for TaskError {
    fn from(err: TypesError) -> Self {
        TaskError::Fatal(err.into())
    }
}

impl From<tokio::task::JoinError> for TaskError {
    fn from(err: tokio::task::JoinError) -> Self {
        TaskError::Fatal(err.into())
    }
}
