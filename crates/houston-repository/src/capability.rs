//! Capability traits implemented by repository adapters.

use std::path::Path;

use async_trait::async_trait;
use houston_types::{Log, Package};

use crate::error::RepositoryResult;

/// Clone and reference listing.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Check `reference` out into `path`, creating the directory.
    async fn clone(&self, path: &Path, reference: &str) -> RepositoryResult<()>;

    /// Every reference name the repository offers (`refs/heads/...`, `refs/tags/...`).
    async fn references(&self) -> RepositoryResult<Vec<String>>;
}

/// Publishing built packages.
#[async_trait]
pub trait PackagePublisher: Send + Sync {
    /// Upload `package` for `stage` (e.g. `review`) built from `reference`.
    ///
    /// Returns the package as stored by the remote side.
    async fn upload_package(
        &self,
        package: &Package,
        stage: &str,
        reference: &str,
    ) -> RepositoryResult<Package>;
}

/// Publishing report logs.
#[async_trait]
pub trait LogPublisher: Send + Sync {
    /// Upload `log` for `stage` built from `reference`.
    async fn upload_log(&self, log: &Log, stage: &str, reference: &str) -> RepositoryResult<Log>;
}

/// A repository adapter and the capabilities it offers.
pub trait Repository: Send + Sync {
    /// Location of the repository, for logs.
    fn url(&self) -> &str;

    fn source_control(&self) -> Option<&dyn SourceControl> {
        None
    }

    fn package_publisher(&self) -> Option<&dyn PackagePublisher> {
        None
    }

    fn log_publisher(&self) -> Option<&dyn LogPublisher> {
        None
    }
}
