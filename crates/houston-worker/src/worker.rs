//! The top-level run orchestrator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use houston_repository::Repository;
use houston_sandbox::{ContainerRuntime, Docker};
use houston_types::{BuildTarget, Context, Level, Log};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{Result, TaskError, WorkerError};
use crate::report::Report;
use crate::task::{Task, TaskConstructor};
use crate::tasks::{default_pipeline, upload_pipeline};
use crate::workspace::{WorkspaceSetup, resolve_build_matrix};

/// Lifecycle of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    SetUp,
    Running,
    /// `run()` skipped tasks after a stop request.
    Stopped,
    Completed,
    TornDown,
}

/// Drives one validation/packaging run for one repository.
///
/// Owns an exclusively named workspace directory for its lifetime. The
/// [`Context`] is handed back through [`into_context`](Self::into_context);
/// the repository handle and container runtime are shared with the caller.
///
/// ```ignore
/// let mut worker = Worker::new(config, repository, Arc::new(DockerCli::new()), context)?;
/// let outcome = worker.execute().await;
/// println!("{}", worker.report_summary().to_markdown());
/// ```
pub struct Worker {
    id: Uuid,
    config: WorkerConfig,
    repository: Arc<dyn Repository>,
    runtime: Arc<dyn ContainerRuntime>,
    context: RwLock<Context>,
    workspace: Option<PathBuf>,
    tasks: Vec<TaskConstructor>,
    upload_tasks: Vec<TaskConstructor>,
    logs: Mutex<Vec<Log>>,
    stopped: AtomicBool,
    state: WorkerState,
}

impl Worker {
    /// Create a worker running the default pipeline.
    ///
    /// Fails if `context` names no references.
    pub fn new(
        config: WorkerConfig,
        repository: Arc<dyn Repository>,
        runtime: Arc<dyn ContainerRuntime>,
        context: Context,
    ) -> Result<Self> {
        if context.references.is_empty() {
            return Err(WorkerError::NoReferences);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            repository,
            runtime,
            context: RwLock::new(context),
            workspace: None,
            tasks: default_pipeline(),
            upload_tasks: upload_pipeline(),
            logs: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            state: WorkerState::Created,
        })
    }

    /// Replace the top-level task list.
    pub fn with_tasks(mut self, tasks: Vec<TaskConstructor>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Replace the tasks run by [`upload`](Self::upload).
    pub fn with_upload_tasks(mut self, tasks: Vec<TaskConstructor>) -> Self {
        self.upload_tasks = tasks;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Shared view of the context. Do not hold across an `.await`.
    pub fn context(&self) -> RwLockReadGuard<'_, Context> {
        self.context.read()
    }

    /// Exclusive view of the context. Do not hold across an `.await`.
    pub fn context_mut(&self) -> RwLockWriteGuard<'_, Context> {
        self.context.write()
    }

    /// Hand the context back to its owner.
    pub fn into_context(self) -> Context {
        self.context.into_inner()
    }

    /// Workspace directory, set between `setup()` and `teardown()`.
    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    pub fn require_workspace(&self) -> Result<&Path> {
        self.workspace().ok_or(WorkerError::NoWorkspace)
    }

    /// Sandbox handle for the task `name`.
    ///
    /// The image is `{image_prefix}-{name}` and container output lands in a
    /// log directory private to this worker.
    pub fn docker(&self, name: &str) -> Docker {
        Docker::new(
            self.runtime.clone(),
            &self.config.image_prefix,
            name,
            self.config.log_dir.join(self.id.to_string()),
        )
    }

    /// Build the sandbox image for `name` from its context directory unless cached.
    pub async fn ensure_image(&self, name: &str) -> Result<Docker> {
        let docker = self.docker(name);
        docker.ensure(self.config.docker_dir.join(name)).await?;
        Ok(docker)
    }

    /// Targets the repository offers packaging for.
    pub async fn build_matrix(&self) -> Result<Vec<BuildTarget>> {
        let source = self
            .repository
            .source_control()
            .ok_or_else(|| WorkerError::NoSourceControl(self.repository.url().to_string()))?;
        let references = source.references().await?;
        Ok(resolve_build_matrix(&self.config, &references))
    }

    /// Allocate the workspace and materialize the checkouts.
    ///
    /// A no-op once a workspace exists. The workspace is only recorded on
    /// success; a failed setup removes its directory again. An expected
    /// setup failure is reported and returned as [`WorkerError::Setup`].
    pub async fn setup(&mut self) -> Result<()> {
        if self.workspace.is_some() {
            return Ok(());
        }

        let path = self.config.workspace_root.join(self.id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        info!(worker = %self.id, workspace = %path.display(), "Workspace allocated");

        let outcome = WorkspaceSetup::new(&path).run(self).await;
        if outcome.is_err() {
            self.remove_workspace(&path).await;
        }

        match outcome {
            Ok(()) => {
                self.workspace = Some(path);
                self.state = WorkerState::SetUp;
                Ok(())
            }
            Err(TaskError::Log(log)) => {
                let title = log.title.clone();
                self.report(log);
                Err(WorkerError::Setup(title))
            }
            Err(TaskError::Fatal(err)) => Err(err),
        }
    }

    /// Run the top-level tasks in order, setting up first if needed.
    ///
    /// The stop flag is checked before each task; an in-flight task is never
    /// interrupted. A fatal task error is returned unchanged.
    pub async fn run(&mut self) -> Result<()> {
        self.setup().await?;
        self.state = WorkerState::Running;

        let workspace = self.require_workspace()?.display().to_string();
        info!(worker = %self.id, workspace = %workspace, tasks = self.tasks.len(), "Running worker");

        for build in &self.tasks {
            if self.is_stopped() {
                info!(worker = %self.id, "Stop requested, skipping remaining tasks");
                break;
            }
            let task = build();
            debug!(worker = %self.id, task = task.name(), workspace = %workspace, "Running task");
            self.run_top_level(task.as_ref()).await?;
        }

        self.state = if self.is_stopped() {
            WorkerState::Stopped
        } else {
            WorkerState::Completed
        };
        info!(worker = %self.id, passes = self.passes(), "Worker finished");
        Ok(())
    }

    /// Run the upload tasks. The stop flag is ignored.
    pub async fn upload(&mut self) -> Result<()> {
        for build in &self.upload_tasks {
            let task = build();
            debug!(worker = %self.id, task = task.name(), "Running upload task");
            self.run_top_level(task.as_ref()).await?;
        }
        Ok(())
    }

    /// A top-level leaf has no composite around it; its log is reported here.
    async fn run_top_level(&self, task: &dyn Task) -> Result<()> {
        match task.run(self).await {
            Ok(()) => Ok(()),
            Err(TaskError::Log(log)) => {
                let stop = log.is_error();
                self.report(log);
                if stop {
                    self.stop();
                }
                Ok(())
            }
            Err(TaskError::Fatal(err)) => {
                error!(worker = %self.id, task = task.name(), error = %err, "Task failed");
                Err(err)
            }
        }
    }

    /// Remove the workspace. Safe to call at any time, any number of times.
    pub async fn teardown(&mut self) {
        if let Some(path) = self.workspace.take() {
            self.remove_workspace(&path).await;
        }
        self.state = WorkerState::TornDown;
    }

    async fn remove_workspace(&self, path: &Path) {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => info!(worker = %self.id, workspace = %path.display(), "Workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(worker = %self.id, workspace = %path.display(), error = %e, "Failed to remove workspace")
            }
        }
    }

    /// Setup, run and upload, then tear down whatever the outcome.
    pub async fn execute(&mut self) -> Result<()> {
        let outcome = match self.run().await {
            Ok(()) => self.upload().await,
            Err(err) => Err(err),
        };
        self.teardown().await;
        outcome
    }

    /// Record a log in the worker's report and in the context.
    pub fn report(&self, log: Log) {
        match log.level {
            Level::Error => warn!(worker = %self.id, title = %log.title, "Error reported"),
            Level::Warn => info!(worker = %self.id, title = %log.title, "Warning reported"),
            _ => debug!(worker = %self.id, level = %log.level, title = %log.title, "Log reported"),
        }
        self.context.write().logs.push(log.clone());
        self.logs.lock().push(log);
    }

    /// Request a cooperative stop before the next top-level task.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Logs reported so far, in report order.
    pub fn logs(&self) -> Vec<Log> {
        self.logs.lock().clone()
    }

    /// True iff an ERROR log has been reported.
    pub fn fails(&self) -> bool {
        self.logs.lock().iter().any(Log::is_error)
    }

    pub fn passes(&self) -> bool {
        !self.fails()
    }

    pub fn report_summary(&self) -> Report {
        Report::new(self.logs())
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("repository", &self.repository.url())
            .field("workspace", &self.workspace)
            .field("state", &self.state)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
