//! Container sandbox for build and validation steps.
//!
//! Every step that touches untrusted application code runs inside a
//! one-shot container with explicit bind mounts. This crate wraps the
//! container runtime behind the [`ContainerRuntime`] trait so that the worker
//! can be driven by a fake runtime in tests, and provides [`Docker`], the
//! per-task handle that names images, accumulates mounts and captures output.
//!
//! # Image naming
//!
//! Images are named `{prefix}-{task}:{tag}`, e.g. `houston-debian-build:latest`.
//! The name is deterministic, so the local image store acts as a shared,
//! append-only cache: call [`Docker::exists`] before [`Docker::create`].
//! Two workers racing to build the same image is tolerated; the runtime
//! keeps whichever build finishes last.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use houston_sandbox::{Docker, DockerCli, RunOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(DockerCli::new());
//! let mut docker = Docker::new(runtime, "houston", "appstream-validate", "/tmp/logs");
//!
//! if !docker.exists("latest").await? {
//!     docker.create("docker/appstream-validate").await?;
//! }
//!
//! docker.mount("/tmp/workspace/package", "/tmp/houston");
//! let code = docker.run(&["validate", "--nonet"], &RunOptions::default()).await?;
//! println!("exit {code}: {}", docker.read_log().await?);
//! # Ok(())
//! # }
//! ```

mod config;
mod docker;
mod error;
mod platform;
mod runtime;

pub use config::{Mount, RunOptions, default_log_dir};
pub use docker::Docker;
pub use error::{SandboxError, SandboxResult};
pub use platform::RuntimeStatus;
pub use runtime::{ContainerRuntime, DockerCli, RunRequest};
