//! In-memory repository for tests.
//!
//! References map to flat file sets; cloning writes those files to disk.
//! Publishing capabilities are opt-in and record every upload.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use houston_types::{Log, Package};
use parking_lot::Mutex;

use crate::capability::{LogPublisher, PackagePublisher, Repository, SourceControl};
use crate::error::{RepositoryError, RepositoryResult};

/// A recorded upload: the value, the stage and the reference.
pub type Upload<T> = (T, String, String);

/// Repository double with configurable capabilities.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    url: String,
    references: Vec<(String, Vec<(PathBuf, String)>)>,
    publishes_packages: bool,
    publishes_logs: bool,
    cloned: Mutex<Vec<String>>,
    packages: Mutex<Vec<Upload<Package>>>,
    logs: Mutex<Vec<Upload<Log>>>,
}

impl MemoryRepository {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a reference whose checkout contains `files` (`path`, `content`).
    pub fn with_reference(mut self, name: impl Into<String>, files: &[(&str, &str)]) -> Self {
        let files = files
            .iter()
            .map(|(path, content)| (PathBuf::from(path), content.to_string()))
            .collect();
        self.references.push((name.into(), files));
        self
    }

    /// Add several references with no files.
    pub fn with_empty_references<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.references.push((name.into(), Vec::new()));
        }
        self
    }

    pub fn with_package_publishing(mut self) -> Self {
        self.publishes_packages = true;
        self
    }

    pub fn with_log_publishing(mut self) -> Self {
        self.publishes_logs = true;
        self
    }

    /// References cloned so far, in clone order.
    pub fn cloned(&self) -> Vec<String> {
        self.cloned.lock().clone()
    }

    pub fn uploaded_packages(&self) -> Vec<Upload<Package>> {
        self.packages.lock().clone()
    }

    pub fn uploaded_logs(&self) -> Vec<Upload<Log>> {
        self.logs.lock().clone()
    }
}

impl Repository for MemoryRepository {
    fn url(&self) -> &str {
        &self.url
    }

    fn source_control(&self) -> Option<&dyn SourceControl> {
        Some(self)
    }

    fn package_publisher(&self) -> Option<&dyn PackagePublisher> {
        self.publishes_packages.then_some(self as &dyn PackagePublisher)
    }

    fn log_publisher(&self) -> Option<&dyn LogPublisher> {
        self.publishes_logs.then_some(self as &dyn LogPublisher)
    }
}

#[async_trait]
impl SourceControl for MemoryRepository {
    async fn clone(&self, path: &Path, reference: &str) -> RepositoryResult<()> {
        let (_, files) = self
            .references
            .iter()
            .find(|(name, _)| name == reference)
            .ok_or_else(|| RepositoryError::ReferenceNotFound(reference.to_string()))?;

        tokio::fs::create_dir_all(path).await?;
        for (file, content) in files {
            let target = path.join(file);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
        }

        self.cloned.lock().push(reference.to_string());
        Ok(())
    }

    async fn references(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.references.iter().map(|(name, _)| name.clone()).collect())
    }
}

#[async_trait]
impl PackagePublisher for MemoryRepository {
    async fn upload_package(
        &self,
        package: &Package,
        stage: &str,
        reference: &str,
    ) -> RepositoryResult<Package> {
        self.packages
            .lock()
            .push((package.clone(), stage.to_string(), reference.to_string()));
        Ok(package.clone())
    }
}

#[async_trait]
impl LogPublisher for MemoryRepository {
    async fn upload_log(&self, log: &Log, stage: &str, reference: &str) -> RepositoryResult<Log> {
        self.logs
            .lock()
            .push((log.clone(), stage.to_string(), reference.to_string()));
        Ok(log.clone())
    }
}
