//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use houston_sandbox::{RunOptions, default_log_dir};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One distribution the worker can build for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub name: String,
    #[serde(default = "default_package_system")]
    pub package_system: String,
    #[serde(default = "default_architectures")]
    pub architectures: Vec<String>,
}

fn default_package_system() -> String {
    "deb".to_string()
}

fn default_architectures() -> Vec<String> {
    vec!["amd64".to_string()]
}

impl DistributionConfig {
    /// A `deb`/`amd64` distribution.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_system: default_package_system(),
            architectures: default_architectures(),
        }
    }

    pub fn with_package_system(mut self, package_system: impl Into<String>) -> Self {
        self.package_system = package_system.into();
        self
    }

    pub fn with_architectures<I, S>(mut self, architectures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.architectures = architectures.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration for a [`Worker`](crate::Worker).
///
/// ```toml
/// workspace_root = "/var/lib/houston/workspaces"
/// stage = "review"
/// container_timeout_secs = 3600
/// default_distribution = "juno"
///
/// [[distributions]]
/// name = "loki"
///
/// [[distributions]]
/// name = "juno"
/// architectures = ["amd64", "i386"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Parent directory of every per-run workspace.
    pub workspace_root: PathBuf,

    /// Prefix of every sandbox image name.
    pub image_prefix: String,

    /// Directory holding one docker build context per sandboxed task.
    pub docker_dir: PathBuf,

    /// Directory receiving container output logs.
    pub log_dir: PathBuf,

    /// Publish stage passed to upload capabilities.
    pub stage: String,

    /// Run containers privileged so repackaged archives keep ownership.
    pub privileged: bool,

    /// Deadline for a single container run; none by default.
    pub container_timeout_secs: Option<u64>,

    /// Distributions in preference order.
    pub distributions: Vec<DistributionConfig>,

    /// Distribution built when the repository offers no packaging branch.
    pub default_distribution: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("houston").join("workspaces"),
            image_prefix: "houston".to_string(),
            docker_dir: PathBuf::from("docker"),
            log_dir: default_log_dir(),
            stage: "review".to_string(),
            privileged: true,
            container_timeout_secs: None,
            distributions: vec![DistributionConfig::new("loki"), DistributionConfig::new("juno")],
            default_distribution: "juno".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = path.into();
        self
    }

    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_prefix = prefix.into();
        self
    }

    pub fn with_docker_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.docker_dir = path.into();
        self
    }

    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = path.into();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn with_container_timeout(mut self, timeout: Duration) -> Self {
        self.container_timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn with_distributions(mut self, distributions: Vec<DistributionConfig>) -> Self {
        self.distributions = distributions;
        self
    }

    pub fn with_default_distribution(mut self, name: impl Into<String>) -> Self {
        self.default_distribution = name.into();
        self
    }

    /// The configured default distribution, if it is among `distributions`.
    pub fn default_distribution(&self) -> Option<&DistributionConfig> {
        self.distributions
            .iter()
            .find(|d| d.name == self.default_distribution)
    }

    pub fn container_timeout(&self) -> Option<Duration> {
        self.container_timeout_secs.map(Duration::from_secs)
    }

    /// Baseline options for sandboxed task runs.
    pub fn run_options(&self) -> RunOptions {
        let options = RunOptions::default().with_privileged(self.privileged);
        match self.container_timeout() {
            Some(timeout) => options.with_timeout(timeout),
            None => options,
        }
    }
}
