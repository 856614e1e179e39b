//! Worker pipeline engine for Houston.
//!
//! A [`Worker`] validates and packages one application repository: it
//! materializes an ephemeral workspace from the repository's references,
//! runs an ordered list of [`Task`]s against it and aggregates the
//! [`Log`](houston_types::Log)s they report into a [`Report`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Worker                                                   │
//! │  - setup: WorkspaceSetup (clone, overlay clean/, dirty/)  │
//! │  - run:   top-level tasks, stop flag checked in between   │
//! │  - upload, teardown                                       │
//! └───────────────┬──────────────────────────────────────────┘
//!                 │
//!     WrapperTask (sequential) / ParallelTask (concurrent)
//!                 │
//!     leaf tasks ── Docker sandbox ── ContainerRuntime
//! ```
//!
//! Tasks fail in two tiers: a [`TaskError::Log`] is caught by the nearest
//! composite and reported, a [`TaskError::Fatal`] aborts the run.

pub mod composite;
pub mod config;
pub mod error;
pub mod registry;
pub mod report;
pub mod task;
pub mod tasks;
pub mod worker;
pub mod workspace;

pub use composite::{ParallelTask, WrapperTask};
pub use config::{DistributionConfig, WorkerConfig};
pub use error::{Result, TaskError, TaskResult, WorkerError};
pub use registry::TaskRegistry;
pub use report::Report;
pub use task::{Task, TaskConstructor, constructor};
pub use tasks::{default_pipeline, upload_pipeline};
pub use worker::{Worker, WorkerState};
pub use workspace::{WorkspaceSetup, overlay, resolve_branches, resolve_build_matrix};
