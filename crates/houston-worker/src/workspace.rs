//! Workspace materialization.
//!
//! Layout of a set-up workspace:
//!
//! ```text
//! <workspace>/
//!   repository/0/ .. repository/n/   one checkout per resolved reference
//!   clean/                            overlay of every checkout, in order
//!   dirty/                            mutable copy of clean/
//!   package/                          install root staged by packaging tasks
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use houston_types::{BuildTarget, Context, Log, short_reference};
use serde_json::json;
use tokio::task;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{DistributionConfig, WorkerConfig};
use crate::error::{TaskResult, WorkerError};
use crate::task::Task;
use crate::worker::Worker;

/// Packaging reference names for `context`, most generic first.
pub fn packaging_candidates(context: &Context) -> Vec<String> {
    let distribution = &context.distribution;
    let system = &context.package_system;

    let mut candidates = vec![
        distribution.clone(),
        format!("{system}-packaging"),
        format!("{system}-packaging-{distribution}"),
    ];
    if let Some(primary) = context.references.first() {
        candidates.push(format!(
            "{system}-packaging-{distribution}-{}",
            short_reference(primary)
        ));
    }
    candidates
}

/// Repository reference whose final segment is `short`, preferring branches.
fn find_reference<'a>(available: &'a [String], short: &str) -> Option<&'a String> {
    let mut matches = available.iter().filter(|r| short_reference(r) == short);
    let first = matches.next()?;
    if first.starts_with("refs/heads/") {
        return Some(first);
    }
    matches
        .find(|r| r.starts_with("refs/heads/"))
        .or(Some(first))
}

/// Full repository name of a caller reference, or the reference unchanged
/// when the repository has no matching entry.
fn canonical_reference(available: &[String], reference: &str) -> String {
    if available.iter().any(|a| a == reference) {
        return reference.to_string();
    }
    find_reference(available, short_reference(reference))
        .cloned()
        .unwrap_or_else(|| reference.to_string())
}

/// The ordered list of references to clone and overlay.
///
/// The caller's references come first, followed by every packaging
/// candidate the repository offers. Caller references are expanded to the
/// repository's full names so a short `loki` and `refs/heads/loki` count
/// as one; duplicates keep their first position.
pub fn resolve_branches(context: &Context, available: &[String]) -> Vec<String> {
    let requested = context
        .references
        .iter()
        .map(|reference| canonical_reference(available, reference));
    let resolved = packaging_candidates(context)
        .into_iter()
        .filter_map(|candidate| find_reference(available, &candidate).cloned());

    let mut seen = HashSet::new();
    requested
        .chain(resolved)
        .filter(|reference| seen.insert(reference.clone()))
        .collect()
}

fn offers(distribution: &DistributionConfig, shorts: &HashSet<&str>) -> bool {
    let packaging = format!(
        "{}-packaging-{}",
        distribution.package_system, distribution.name
    );
    shorts.contains(distribution.name.as_str()) || shorts.contains(packaging.as_str())
}

fn targets(distribution: &DistributionConfig) -> impl Iterator<Item = BuildTarget> + '_ {
    distribution.architectures.iter().map(|architecture| {
        BuildTarget::new(
            architecture,
            &distribution.name,
            &distribution.package_system,
        )
    })
}

/// Distributions and architectures a repository can be built for.
///
/// Every configured distribution with a `{name}` or
/// `{package_system}-packaging-{name}` reference contributes one target per
/// architecture, in configured order. With no match the default
/// distribution is built alone.
pub fn resolve_build_matrix(config: &WorkerConfig, references: &[String]) -> Vec<BuildTarget> {
    let shorts: HashSet<&str> = references.iter().map(|r| short_reference(r)).collect();

    let matrix: Vec<BuildTarget> = config
        .distributions
        .iter()
        .filter(|distribution| offers(distribution, &shorts))
        .flat_map(targets)
        .collect();

    if !matrix.is_empty() {
        return matrix;
    }
    config
        .default_distribution()
        .map(|distribution| targets(distribution).collect())
        .unwrap_or_default()
}

/// Remove whatever sits at `path` unless it is a directory we can reuse.
fn clear_conflict(path: &Path, keep_dir: bool) -> io::Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    if metadata.is_dir() {
        if !keep_dir {
            fs::remove_dir_all(path)?;
        }
    } else if keep_dir || metadata.file_type().is_symlink() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(source)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

/// Copy the tree at `source` onto `target`, last writer wins.
///
/// `.git` directories are skipped. Returns the number of files written.
pub fn overlay(source: &Path, target: &Path) -> io::Result<usize> {
    fs::create_dir_all(target)?;

    let mut written = 0;
    let entries = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in entries {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let destination = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            clear_conflict(&destination, true)?;
            fs::create_dir_all(&destination)?;
            continue;
        }

        clear_conflict(&destination, false)?;
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
        written += 1;
    }
    Ok(written)
}

/// Clones the resolved references and builds `clean/` and `dirty/`.
///
/// Works on the directory it was given rather than the worker's workspace,
/// which is only recorded once setup has succeeded.
pub struct WorkspaceSetup {
    workspace: PathBuf,
}

impl WorkspaceSetup {
    pub const NAME: &'static str = "workspace-setup";

    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl Task for WorkspaceSetup {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let workspace = self.workspace.clone();
        let repository = worker.repository();
        let source = repository
            .source_control()
            .ok_or_else(|| WorkerError::NoSourceControl(repository.url().to_string()))?;

        let available = source.references().await?;
        let branches = {
            let context = worker.context();
            let missing: Vec<&String> = context
                .references
                .iter()
                .filter(|r| !available.iter().any(|a| a == *r || short_reference(a) == r.as_str()))
                .collect();
            if !missing.is_empty() {
                return Err(Log::error("Reference not found")
                    .with_body(format!(
                        "The repository `{}` has no reference named {}.",
                        repository.url(),
                        missing
                            .iter()
                            .map(|r| format!("`{r}`"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                    .with_data(json!({ "missing": missing, "available": available }))
                    .into());
            }
            resolve_branches(&context, &available)
        };

        info!(
            workspace = %workspace.display(),
            branches = ?branches,
            "Setting up workspace"
        );

        let checkouts = workspace.join("repository");
        for (index, branch) in branches.iter().enumerate() {
            let path = checkouts.join(index.to_string());
            debug!(branch = %branch, path = %path.display(), "Cloning reference");
            source.clone(&path, branch).await?;
        }

        let clean = workspace.join("clean");
        let dirty = workspace.join("dirty");
        let count = branches.len();
        task::spawn_blocking(move || -> io::Result<()> {
            for index in 0..count {
                let written = overlay(&checkouts.join(index.to_string()), &clean)?;
                debug!(index, written, "Overlaid checkout");
            }
            overlay(&clean, &dirty)?;
            Ok(())
        })
        .await??;

        Ok(())
    }
}
