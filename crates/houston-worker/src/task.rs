//! The unit of orchestrated work.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskResult;
use crate::worker::Worker;

/// One check or mutation performed against a running [`Worker`].
///
/// Return `Err(TaskError::Log(..))` for an expected, reportable condition and
/// `Err(TaskError::Fatal(..))` for anything that should abort the run. Tasks
/// that write files a later task depends on write to a distinct path and
/// rename on success.
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable name, also used for the task's sandbox image.
    fn name(&self) -> &str;

    async fn run(&self, worker: &Worker) -> TaskResult<()>;
}

/// Builds a fresh task instance for each run.
pub type TaskConstructor = Arc<dyn Fn() -> Box<dyn Task> + Send + Sync>;

/// Wrap a task-producing closure as a [`TaskConstructor`].
///
/// ```ignore
/// let ctor = constructor(|| PackageFileCheck::binary());
/// ```
pub fn constructor<T, F>(build: F) -> TaskConstructor
where
    T: Task + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Arc::new(move || Box::new(build()) as Box<dyn Task>)
}
