//! Publishing through whichever capabilities the repository offers.

use async_trait::async_trait;
use houston_types::Level;
use tracing::{debug, info};

use crate::error::TaskResult;
use crate::task::Task;
use crate::worker::Worker;

/// The most specific reference of the run.
fn publish_reference(worker: &Worker) -> String {
    worker
        .context()
        .references
        .last()
        .cloned()
        .unwrap_or_default()
}

/// Publishes the built package.
pub struct UploadPackage;

impl UploadPackage {
    pub const NAME: &'static str = "upload-package";
}

#[async_trait]
impl Task for UploadPackage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let repository = worker.repository();
        let Some(publisher) = repository.package_publisher() else {
            debug!(repository = repository.url(), "Repository does not publish packages");
            return Ok(());
        };
        let Some(package) = worker.context().package.clone() else {
            debug!("No package to publish");
            return Ok(());
        };

        let reference = publish_reference(worker);
        let stage = &worker.config().stage;
        let published = publisher
            .upload_package(&package, stage, &reference)
            .await?;
        info!(package = %published.name, stage = %stage, reference = %reference, "Package published");

        worker.context_mut().package = Some(published);
        Ok(())
    }
}

/// Publishes every WARN and ERROR log.
pub struct UploadLog;

impl UploadLog {
    pub const NAME: &'static str = "upload-log";
}

#[async_trait]
impl Task for UploadLog {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let repository = worker.repository();
        let Some(publisher) = repository.log_publisher() else {
            debug!(repository = repository.url(), "Repository does not publish logs");
            return Ok(());
        };

        let reference = publish_reference(worker);
        let stage = &worker.config().stage;
        let issues: Vec<_> = worker
            .logs()
            .into_iter()
            .filter(|log| log.level >= Level::Warn)
            .collect();

        for log in &issues {
            publisher.upload_log(log, stage, &reference).await?;
        }
        debug!(count = issues.len(), "Logs published");
        Ok(())
    }
}
