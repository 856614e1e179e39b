//! Run configuration for sandboxed containers.

use std::path::PathBuf;
use std::time::Duration;

/// A host directory bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: PathBuf,
}

impl Mount {
    pub fn new(host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }

    /// `host:container` as passed to `docker run -v`.
    pub fn to_volume_arg(&self) -> String {
        format!("{}:{}", self.host.display(), self.container.display())
    }
}

/// Options for a single container run.
///
/// # Privileged runs
///
/// Repackaging archives inside the container has to preserve file ownership
/// and permissions of the bind-mounted tree, which requires a privileged
/// container. Runs are therefore privileged unless explicitly disabled.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run the container with `--privileged`.
    pub privileged: bool,

    /// Environment variables passed to the container.
    pub env: Vec<(String, String)>,

    /// Working directory inside the container.
    pub workdir: Option<PathBuf>,

    /// Deadline for the run. `None` waits for the container to exit.
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            privileged: true,
            env: Vec::new(),
            workdir: None,
            timeout: None,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn add_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Default directory for captured container output.
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("houston")
        .join("logs")
}
