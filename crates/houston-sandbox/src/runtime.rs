//! Container runtime abstraction and the docker CLI implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::{Mount, RunOptions};
use crate::error::{SandboxError, SandboxResult};

/// Exit code docker uses when it could not start the container at all.
const DOCKER_RUN_FAILURE: i32 = 125;

/// Everything needed to start one container.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub image: String,
    pub args: Vec<String>,
    pub mounts: Vec<Mount>,
    pub options: RunOptions,
}

/// Operations the sandbox needs from a container runtime.
///
/// Implementations report infrastructure trouble as [`SandboxError`] and a
/// container that ran to completion as its exit code, whatever the value.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether `image` is present in the local image store.
    async fn image_exists(&self, image: &str) -> SandboxResult<bool>;

    /// Build `image` from a build-context directory.
    async fn build_image(&self, image: &str, context_dir: &Path) -> SandboxResult<()>;

    /// Run a container to completion, writing combined output to `log_file`.
    async fn run_container(&self, request: &RunRequest, log_file: &Path) -> SandboxResult<i32>;
}

/// [`ContainerRuntime`] backed by the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a specific client binary (e.g. `podman`).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> SandboxError {
        if e.kind() == std::io::ErrorKind::NotFound {
            SandboxError::Unavailable {
                message: format!("{} not found", self.binary.display()),
                install_hint: crate::RuntimeStatus::detect_binary(&self.binary.to_string_lossy())
                    .install_hint()
                    .unwrap_or_default()
                    .to_string(),
            }
        } else {
            SandboxError::Io(e)
        }
    }

    /// Unique name for one container run.
    pub fn container_name() -> String {
        format!("houston-{}", Uuid::new_v4())
    }

    /// Arguments for `docker run`, excluding the binary itself.
    pub fn run_args(request: &RunRequest, name: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--pull=never".to_string(),
            "--name".to_string(),
            name.to_string(),
        ];
        if request.options.privileged {
            args.push("--privileged".to_string());
        }
        for (key, value) in &request.options.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(dir) = &request.options.workdir {
            args.push("-w".to_string());
            args.push(dir.display().to_string());
        }
        for mount in &request.mounts {
            args.push("-v".to_string());
            args.push(mount.to_volume_arg());
        }
        args.push(request.image.clone());
        args.extend(request.args.iter().cloned());
        args
    }

    /// Arguments that force-remove the container called `name`.
    pub fn remove_args(name: &str) -> Vec<String> {
        vec!["rm".to_string(), "-f".to_string(), name.to_string()]
    }

    /// Killing the client does not stop the container; the daemon has to.
    async fn remove_container(&self, name: &str) {
        let removed = self
            .command()
            .args(Self::remove_args(name))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;
        match removed {
            Ok(output) if output.status.success() => {
                tracing::debug!(container = name, "Container removed");
            }
            Ok(output) => tracing::warn!(
                container = name,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Failed to remove container"
            ),
            Err(e) => tracing::warn!(container = name, error = %e, "Failed to remove container"),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn image_exists(&self, image: &str) -> SandboxResult<bool> {
        let output = self
            .command()
            .args(["image", "inspect", "--format", "{{.Id}}", image])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such image") || stderr.contains("no such image") {
            Ok(false)
        } else {
            Err(SandboxError::Unavailable {
                message: stderr.trim().to_string(),
                install_hint: String::new(),
            })
        }
    }

    async fn build_image(&self, image: &str, context_dir: &Path) -> SandboxResult<()> {
        if !context_dir.is_dir() {
            return Err(SandboxError::ContextMissing(context_dir.to_path_buf()));
        }

        tracing::info!(image, context = %context_dir.display(), "Building image");

        let output = self
            .command()
            .arg("build")
            .arg("-t")
            .arg(image)
            .arg(context_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SandboxError::BuildFailed {
                image: image.to_string(),
                output: format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                ),
            })
        }
    }

    async fn run_container(&self, request: &RunRequest, log_file: &Path) -> SandboxResult<i32> {
        if let Some(parent) = log_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let log = tokio::fs::File::create(log_file).await?.into_std().await;
        let name = Self::container_name();
        let args = Self::run_args(request, &name);

        tracing::debug!(
            image = %request.image,
            container = %name,
            log = %log_file.display(),
            args = ?args,
            "Running container"
        );

        let mut child = self
            .command()
            .args(&args)
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let status = match request.options.timeout {
            Some(deadline) => {
                let waited = timeout(deadline, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        tracing::warn!(container = %name, ?deadline, "Container timed out");
                        if let Err(e) = child.kill().await {
                            tracing::warn!(container = %name, error = %e, "Failed to stop client");
                        }
                        self.remove_container(&name).await;
                        return Err(SandboxError::Timeout(deadline));
                    }
                }
            }
            None => child.wait().await?,
        };

        let code = status.code().unwrap_or(-1);
        if code == DOCKER_RUN_FAILURE {
            let output = tokio::fs::read_to_string(log_file).await.unwrap_or_default();
            return Err(SandboxError::ExecutionFailed(format!(
                "{} could not start {}: {}",
                self.binary.display(),
                request.image,
                output.trim()
            )));
        }
        Ok(code)
    }
}
