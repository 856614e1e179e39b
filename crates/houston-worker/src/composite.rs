//! Sequential and concurrent task composition.
//!
//! [`WrapperTask`] and [`ParallelTask`] share one contract: children that
//! return a [`Log`] have it collected; once every child is done the collected
//! logs are forwarded to the worker, and an ERROR among them requests a
//! cooperative stop. A fatal child error is never caught.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use houston_types::Log;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{TaskError, TaskResult};
use crate::task::{Task, TaskConstructor};
use crate::worker::Worker;

/// Report `logs` and stop the worker if any is an error.
fn forward(worker: &Worker, logs: &[Log]) {
    for log in logs {
        worker.report(log.clone());
    }
    if logs.iter().any(Log::is_error) {
        worker.stop();
    }
}

/// Runs children one after another, in declaration order.
///
/// A fatal error from child *i* aborts the wrapper immediately: children
/// after *i* never run and nothing collected so far is forwarded.
pub struct WrapperTask {
    name: String,
    children: Vec<TaskConstructor>,
    logs: Mutex<Vec<Log>>,
}

impl WrapperTask {
    pub fn new(name: impl Into<String>, children: Vec<TaskConstructor>) -> Self {
        Self {
            name: name.into(),
            children,
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Logs collected by the last run, in declaration order.
    pub fn logs(&self) -> Vec<Log> {
        self.logs.lock().clone()
    }
}

#[async_trait]
impl Task for WrapperTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        self.logs.lock().clear();

        for build in &self.children {
            let child = build();
            debug!(wrapper = %self.name, task = child.name(), "Running task");
            match child.run(worker).await {
                Ok(()) => {}
                Err(TaskError::Log(log)) => self.logs.lock().push(log),
                Err(fatal) => return Err(fatal),
            }
        }

        let logs = self.logs();
        forward(worker, &logs);
        Ok(())
    }
}

/// Runs all children concurrently.
///
/// Logs are collected in completion order. The policy on fatal errors is
/// fail-safe: every child runs to completion, then the first fatal error to
/// arrive is returned and the collected logs are kept on the task without
/// being forwarded.
pub struct ParallelTask {
    name: String,
    children: Vec<TaskConstructor>,
    logs: Mutex<Vec<Log>>,
}

impl ParallelTask {
    pub fn new(name: impl Into<String>, children: Vec<TaskConstructor>) -> Self {
        Self {
            name: name.into(),
            children,
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Logs collected by the last run, in completion order.
    pub fn logs(&self) -> Vec<Log> {
        self.logs.lock().clone()
    }
}

#[async_trait]
impl Task for ParallelTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        self.logs.lock().clear();

        let children: Vec<Box<dyn Task>> = self.children.iter().map(|build| build()).collect();
        debug!(
            parallel = %self.name,
            tasks = ?children.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "Running tasks concurrently"
        );

        let mut pending: FuturesUnordered<_> =
            children.iter().map(|child| child.run(worker)).collect();

        let mut fatal = None;
        while let Some(result) = pending.next().await {
            match result {
                Ok(()) => {}
                Err(TaskError::Log(log)) => self.logs.lock().push(log),
                Err(TaskError::Fatal(err)) => {
                    if fatal.is_some() {
                        warn!(parallel = %self.name, error = %err, "Additional fatal error");
                    } else {
                        fatal = Some(err);
                    }
                }
            }
        }
        drop(pending);

        if let Some(err) = fatal {
            return Err(TaskError::Fatal(err));
        }

        let logs = self.logs();
        forward(worker, &logs);
        Ok(())
    }
}
