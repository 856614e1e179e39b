//! Per-task container handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Mount, RunOptions};
use crate::error::{SandboxError, SandboxResult};
use crate::runtime::{ContainerRuntime, RunRequest};

const DEFAULT_TAG: &str = "latest";

/// A named container image plus the bind mounts one task wants.
///
/// The handle is cheap to build; tasks create one per run, register mounts
/// with [`mount`](Self::mount) and then call [`run`](Self::run).
pub struct Docker {
    runtime: Arc<dyn ContainerRuntime>,
    prefix: String,
    name: String,
    tag: String,
    log_dir: PathBuf,
    mounts: Vec<Mount>,
}

impl Docker {
    /// Create a handle for image `{prefix}-{name}:latest`.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        prefix: impl Into<String>,
        name: impl Into<String>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            prefix: prefix.into(),
            name: name.into(),
            tag: DEFAULT_TAG.to_string(),
            log_dir: log_dir.into(),
            mounts: Vec::new(),
        }
    }

    /// Use a tag other than `latest` for [`create`](Self::create) and [`run`](Self::run).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Repository part of the image name, `{prefix}-{name}`.
    pub fn repository(&self) -> String {
        format!("{}-{}", self.prefix, self.name)
    }

    /// Full image reference for `tag`.
    pub fn image_for(&self, tag: &str) -> String {
        format!("{}:{}", self.repository(), tag)
    }

    /// Full image reference for this handle's tag.
    pub fn image(&self) -> String {
        self.image_for(&self.tag)
    }

    /// File receiving the combined output of [`run`](Self::run).
    pub fn log_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("{}-{}.log", self.repository(), self.tag))
    }

    /// Registered mounts, in registration order.
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Whether the image for `tag` has been built.
    pub async fn exists(&self, tag: &str) -> SandboxResult<bool> {
        self.runtime.image_exists(&self.image_for(tag)).await
    }

    /// Build this handle's image from `context_dir`.
    ///
    /// Always rebuilds; call [`exists`](Self::exists) first to reuse a cached image.
    pub async fn create(&self, context_dir: impl AsRef<Path>) -> SandboxResult<()> {
        let image = self.image();
        self.runtime
            .build_image(&image, context_dir.as_ref())
            .await?;
        tracing::info!(image = %image, "Image created");
        Ok(())
    }

    /// Build the image from `context_dir` unless it already exists.
    pub async fn ensure(&self, context_dir: impl AsRef<Path>) -> SandboxResult<()> {
        if self.exists(&self.tag).await? {
            tracing::debug!(image = %self.image(), "Image cached");
            return Ok(());
        }
        self.create(context_dir).await
    }

    /// Bind-mount `host` at `container` for subsequent runs.
    pub fn mount(&mut self, host: impl Into<PathBuf>, container: impl Into<PathBuf>) {
        self.mounts.push(Mount::new(host, container));
    }

    /// Run the image to completion and return its exit code.
    ///
    /// Output is captured to [`log_path`](Self::log_path). A missing image is
    /// an error, not an exit code.
    pub async fn run(&self, args: &[&str], options: &RunOptions) -> SandboxResult<i32> {
        let image = self.image();
        if !self.runtime.image_exists(&image).await? {
            return Err(SandboxError::ImageMissing(image));
        }

        let request = RunRequest {
            image,
            args: args.iter().map(|a| a.to_string()).collect(),
            mounts: self.mounts.clone(),
            options: options.clone(),
        };
        let log_path = self.log_path();
        let code = self.runtime.run_container(&request, &log_path).await?;

        tracing::debug!(image = %request.image, code, "Container exited");
        Ok(code)
    }

    /// Read the output captured by the last run.
    pub async fn read_log(&self) -> SandboxResult<String> {
        match tokio::fs::read_to_string(self.log_path()).await {
            Ok(log) => Ok(log),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for Docker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Docker")
            .field("image", &self.image())
            .field("mounts", &self.mounts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Runtime that records calls and keeps images in memory.
    #[derive(Default)]
    struct RecordingRuntime {
        images: Mutex<HashSet<String>>,
        runs: Mutex<Vec<RunRequest>>,
        exit_code: i32,
    }

    #[async_trait]
    impl ContainerRuntime for RecordingRuntime {
        async fn image_exists(&self, image: &str) -> SandboxResult<bool> {
            Ok(self.images.lock().unwrap().contains(image))
        }

        async fn build_image(&self, image: &str, _context_dir: &Path) -> SandboxResult<()> {
            self.images.lock().unwrap().insert(image.to_string());
            Ok(())
        }

        async fn run_container(
            &self,
            request: &RunRequest,
            log_file: &Path,
        ) -> SandboxResult<i32> {
            std::fs::create_dir_all(log_file.parent().unwrap())?;
            std::fs::write(log_file, format!("ran {}", request.args.join(" ")))?;
            self.runs.lock().unwrap().push(request.clone());
            Ok(self.exit_code)
        }
    }

    fn docker(runtime: Arc<RecordingRuntime>, log_dir: &Path) -> Docker {
        Docker::new(runtime, "houston", "lint", log_dir)
    }

    #[test]
    fn test_naming() {
        let runtime = Arc::new(RecordingRuntime::default());
        let d = docker(runtime, Path::new("/logs")).with_tag("abc");
        assert_eq!(d.repository(), "houston-lint");
        assert_eq!(d.image(), "houston-lint:abc");
        assert_eq!(d.image_for("other"), "houston-lint:other");
        assert_eq!(d.log_path(), PathBuf::from("/logs/houston-lint-abc.log"));
    }

    #[tokio::test]
    async fn test_exists_after_create() {
        let runtime = Arc::new(RecordingRuntime::default());
        let d = docker(runtime, Path::new("/logs")).with_tag("t1");
        assert!(!d.exists("t1").await.unwrap());
        d.create("/ctx").await.unwrap();
        assert!(d.exists("t1").await.unwrap());
        assert!(!d.exists("t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_builds_once() {
        let runtime = Arc::new(RecordingRuntime::default());
        let d = docker(runtime.clone(), Path::new("/logs"));
        d.ensure("/ctx").await.unwrap();
        d.ensure("/ctx").await.unwrap();
        assert_eq!(runtime.images.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_requires_image() {
        let runtime = Arc::new(RecordingRuntime::default());
        let d = docker(runtime, Path::new("/logs"));
        let err = d.run(&["true"], &RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, SandboxError::ImageMissing(image) if image == "houston-lint:latest"));
    }

    #[tokio::test]
    async fn test_run_accumulates_mounts_and_captures_log() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(RecordingRuntime {
            exit_code: 3,
            ..Default::default()
        });
        let mut d = docker(runtime.clone(), dir.path());
        d.create("/ctx").await.unwrap();
        d.mount("/a", "/x");
        d.mount("/b", "/y");

        let code = d.run(&["check", "--strict"], &RunOptions::default()).await.unwrap();
        assert_eq!(code, 3);

        let runs = runtime.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].mounts.len(), 2);
        assert_eq!(runs[0].mounts[1], Mount::new("/b", "/y"));
        drop(runs);

        assert_eq!(d.read_log().await.unwrap(), "ran check --strict");
    }

    #[tokio::test]
    async fn test_read_log_before_run_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(RecordingRuntime::default());
        let d = docker(runtime, dir.path());
        assert_eq!(d.read_log().await.unwrap(), "");
    }
}
