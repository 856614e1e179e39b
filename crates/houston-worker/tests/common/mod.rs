//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use houston_repository::MemoryRepository;
use houston_sandbox::{ContainerRuntime, RunRequest, SandboxResult};
use houston_types::{Context, Log};
use houston_worker::{Task, TaskError, TaskResult, Worker, WorkerConfig, WorkerError};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const DOMAIN: &str = "com.example.App";
pub const SANITIZED: &str = "com.example.app";

/// Produces an exit code and captured output for a container run.
pub type Handler = Box<dyn Fn(&RunRequest) -> (i32, String) + Send + Sync>;

/// Container runtime that keeps images in memory and scripts runs.
pub struct FakeRuntime {
    images: Mutex<HashSet<String>>,
    builds: Mutex<Vec<String>>,
    runs: Mutex<Vec<RunRequest>>,
    handler: Handler,
}

impl FakeRuntime {
    /// Every run succeeds with no output.
    pub fn new() -> Self {
        Self::with_handler(|_| (0, String::new()))
    }

    pub fn with_handler(
        handler: impl Fn(&RunRequest) -> (i32, String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            images: Mutex::new(HashSet::new()),
            builds: Mutex::new(Vec::new()),
            runs: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn builds(&self) -> Vec<String> {
        self.builds.lock().clone()
    }

    pub fn runs(&self) -> Vec<RunRequest> {
        self.runs.lock().clone()
    }

    /// First argument of every run, in run order.
    pub fn programs(&self) -> Vec<String> {
        self.runs
            .lock()
            .iter()
            .map(|r| r.args.first().cloned().unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn image_exists(&self, image: &str) -> SandboxResult<bool> {
        Ok(self.images.lock().contains(image))
    }

    async fn build_image(&self, image: &str, _context_dir: &Path) -> SandboxResult<()> {
        self.images.lock().insert(image.to_string());
        self.builds.lock().push(image.to_string());
        Ok(())
    }

    async fn run_container(&self, request: &RunRequest, log_file: &Path) -> SandboxResult<i32> {
        let (code, output) = (self.handler)(request);
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(log_file, output)?;
        self.runs.lock().push(request.clone());
        Ok(code)
    }
}

/// Host side of the first mount of `request`.
pub fn mounted_host(request: &RunRequest) -> PathBuf {
    request.mounts[0].host.clone()
}

/// What a [`Scripted`] task does once its delay has passed.
#[derive(Clone)]
pub enum Outcome {
    Pass,
    Log(Log),
    Fatal(&'static str),
}

/// Task that sleeps, records its name and then produces an [`Outcome`].
pub struct Scripted {
    name: String,
    delay: Duration,
    outcome: Outcome,
    trace: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    pub fn new(name: &str, outcome: Outcome, trace: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            outcome,
            trace: trace.clone(),
        }
    }

    pub fn after(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

#[async_trait]
impl Task for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _worker: &Worker) -> TaskResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.trace.lock().push(self.name.clone());
        match &self.outcome {
            Outcome::Pass => Ok(()),
            Outcome::Log(log) => Err(TaskError::Log(log.clone())),
            Outcome::Fatal(message) => Err(TaskError::Fatal(WorkerError::Io(
                std::io::Error::other(*message),
            ))),
        }
    }
}

pub fn trace() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Repository with an application branch and a packaging branch.
pub fn app_repository() -> MemoryRepository {
    MemoryRepository::new("mem://app")
        .with_reference(
            "refs/heads/master",
            &[("README.md", "master"), ("src/main.vala", "void main () {}")],
        )
        .with_reference(
            "refs/heads/deb-packaging",
            &[
                ("debian/control", "Source: {{ name }}\nMaintainer: {{ developer }}\n"),
                ("debian/rules", "#!/usr/bin/make -f\n"),
            ],
        )
        .with_reference("refs/heads/loki", &[("README.md", "loki")])
}

pub fn context() -> Context {
    Context::new(DOMAIN)
        .with_developer("Jane Doe <jane@example.com>")
        .with_version("1.2.0")
        .with_references(["refs/heads/master"])
}

pub fn config(root: &Path) -> WorkerConfig {
    WorkerConfig::default()
        .with_workspace_root(root.join("workspaces"))
        .with_log_dir(root.join("logs"))
        .with_docker_dir(root.join("docker"))
}

pub fn worker(
    root: &Path,
    repository: Arc<MemoryRepository>,
    runtime: Arc<FakeRuntime>,
) -> Worker {
    init_tracing();
    Worker::new(config(root), repository, runtime, context()).unwrap()
}
