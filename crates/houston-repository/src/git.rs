//! Source control through libgit2.
//!
//! Works against anything libgit2 can fetch from: remote URLs and local
//! repository paths alike. Blocking libgit2 calls run on the blocking pool.

use std::path::Path;

use async_trait::async_trait;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Direction, Remote};
use tokio::task;
use tracing::{debug, info};

use crate::capability::{Repository, SourceControl};
use crate::error::{RepositoryError, RepositoryResult};

/// A git repository identified by URL or local path.
#[derive(Debug)]
pub struct GitRepository {
    url: String,
}

impl GitRepository {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Repository for GitRepository {
    fn url(&self) -> &str {
        &self.url
    }

    fn source_control(&self) -> Option<&dyn SourceControl> {
        Some(self)
    }
}

#[async_trait]
impl SourceControl for GitRepository {
    async fn clone(&self, path: &Path, reference: &str) -> RepositoryResult<()> {
        let url = self.url.clone();
        let path = path.to_path_buf();
        let reference = reference.to_string();

        task::spawn_blocking(move || clone_reference(&url, &path, &reference))
            .await
            .map_err(|e| RepositoryError::CloneFailed(format!("Task join error: {e}")))?
    }

    async fn references(&self) -> RepositoryResult<Vec<String>> {
        let url = self.url.clone();
        task::spawn_blocking(move || list_references(&url))
            .await
            .map_err(|e| RepositoryError::CloneFailed(format!("Task join error: {e}")))?
    }
}

/// `git ls-remote` without peeled tag entries or `HEAD`.
fn list_references(url: &str) -> RepositoryResult<Vec<String>> {
    let mut remote = Remote::create_detached(url)?;
    remote.connect(Direction::Fetch)?;

    let references = remote
        .list()?
        .iter()
        .map(|head| head.name().to_string())
        .filter(|name| name != "HEAD" && !name.ends_with("^{}"))
        .collect();

    remote.disconnect()?;
    Ok(references)
}

/// Where a reference lands in a fresh clone.
fn local_target(reference: &str) -> String {
    if let Some(branch) = reference.strip_prefix("refs/heads/") {
        format!("refs/remotes/origin/{branch}")
    } else if !reference.contains('/') {
        format!("refs/remotes/origin/{reference}")
    } else {
        reference.to_string()
    }
}

fn clone_reference(url: &str, path: &Path, reference: &str) -> RepositoryResult<()> {
    info!(url, reference, path = %path.display(), "Cloning repository");

    let repo = RepoBuilder::new()
        .clone(url, path)
        .map_err(|e| RepositoryError::CloneFailed(e.to_string()))?;

    let object = match repo.revparse_single(&local_target(reference)) {
        Ok(object) => object,
        Err(_) => {
            debug!(reference, "Reference not in default fetch, fetching explicitly");
            let mut origin = repo.find_remote("origin")?;
            origin
                .fetch(&[reference], None, None)
                .map_err(|_| RepositoryError::ReferenceNotFound(reference.to_string()))?;
            repo.revparse_single("FETCH_HEAD")?
        }
    };

    let commit = object.peel_to_commit()?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;

    debug!(reference, commit = %commit.id(), "Checked out reference");
    Ok(())
}
