//! Debian packaging steps.
//!
//! All four operate on `dirty/`, the only mutable copy of the sources, and
//! stage the built archive's contents under `package/`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use houston_types::{
    ChangelogEntry, Context, Level, Log, Package, PackageKind, render_template,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{CONTAINER_ROOT, command_failure, write_atomic};
use crate::error::TaskResult;
use crate::task::Task;
use crate::worker::Worker;

/// Debian source/binary package name for the application.
///
/// Lowercase, with anything outside `[a-z0-9.+-]` turned into `-`.
pub fn debian_package_name(context: &Context) -> String {
    context
        .name_domain
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Render `entries` as a `debian/changelog`, in the order given.
pub fn render_changelog(package: &str, distribution: &str, entries: &[ChangelogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{package} ({}) {distribution}; urgency=medium\n\n",
            entry.version
        ));
        for change in &entry.changes {
            out.push_str(&format!("  * {change}\n"));
        }
        out.push_str(&format!(
            "\n -- {}  {}\n\n",
            entry.author,
            entry.date.format("%a, %d %b %Y %H:%M:%S %z")
        ));
    }
    out
}

/// Changelog entries, or a single release entry when the history is empty.
fn changelog_entries(context: &Context) -> Vec<ChangelogEntry> {
    if !context.changelog.is_empty() {
        return context.changelog.clone();
    }
    vec![ChangelogEntry {
        author: context
            .name_developer
            .clone()
            .unwrap_or_else(|| "Houston <houston@localhost>".to_string()),
        date: Utc::now(),
        version: context.version.clone(),
        changes: vec![format!("Release {}", context.version)],
    }]
}

fn missing_debian_dir() -> Log {
    Log::error("Missing debian directory").with_body(
        "The sources contain no `debian` directory. Add one on a packaging \
         branch such as `deb-packaging`.",
    )
}

fn dirty_debian_dir(worker: &Worker) -> TaskResult<PathBuf> {
    Ok(worker.require_workspace()?.join("dirty").join("debian"))
}

/// Writes `dirty/debian/changelog` from the context's release history.
pub struct DebianChangelog;

impl DebianChangelog {
    pub const NAME: &'static str = "debian-changelog";
}

#[async_trait]
impl Task for DebianChangelog {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let debian = dirty_debian_dir(worker)?;
        if !tokio::fs::try_exists(&debian).await? {
            return Err(missing_debian_dir().into());
        }

        let content = {
            let context = worker.context();
            render_changelog(
                &debian_package_name(&context),
                &context.distribution,
                &changelog_entries(&context),
            )
        };
        write_atomic(&debian.join("changelog"), &content).await?;
        debug!(path = %debian.join("changelog").display(), "Wrote changelog");
        Ok(())
    }
}

/// Fills `{{ ... }}` placeholders in `dirty/debian/control`.
///
/// Available fields: `name`, `name_domain`, `name_human`, `name_appstream`,
/// `developer`, `architecture`, `distribution`, `version`.
pub struct DebianControl;

impl DebianControl {
    pub const NAME: &'static str = "debian-control";

    fn fields(context: &Context) -> Value {
        json!({
            "name": debian_package_name(context),
            "name_domain": context.name_domain,
            "name_human": context.name_human(),
            "name_appstream": context.name_appstream(),
            "developer": context.name_developer.clone().unwrap_or_default(),
            "architecture": context.architecture,
            "distribution": context.distribution,
            "version": context.version,
        })
    }
}

#[async_trait]
impl Task for DebianControl {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let path = dirty_debian_dir(worker)?.join("control");
        let template = match tokio::fs::read_to_string(&path).await {
            Ok(template) => template,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Log::error("Missing debian control file")
                    .with_body("Expected `debian/control` in the packaging sources.")
                    .into());
            }
            Err(e) => return Err(e.into()),
        };

        let fields = Self::fields(&worker.context());
        let rendered = render_template(&template, &fields).map_err(|e| {
            Log::error("Invalid debian control file")
                .with_body(format!("`debian/control` could not be filled in: {e}"))
        })?;

        write_atomic(&path, &rendered).await?;
        Ok(())
    }
}

/// The `.deb` for `package` directly inside `dir`.
///
/// Builds may emit several archives (`-dbgsym` and friends); the one named
/// `<package>_...` wins, otherwise the first by name.
async fn find_archive(dir: &Path, package: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut archives = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == PackageKind::Deb.extension()) {
            archives.push(path);
        }
    }
    archives.sort();

    let prefix = format!("{package}_");
    let named = archives.iter().position(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix))
    });
    Ok(match named {
        Some(index) => Some(archives.swap_remove(index)),
        None => archives.into_iter().next(),
    })
}

/// Builds the binary package from `dirty/` inside the sandbox.
///
/// The archive is moved to `<name>_<version>_<arch>.deb` at the workspace
/// root and recorded as the context's package.
pub struct DebianBuild;

impl DebianBuild {
    pub const NAME: &'static str = "debian-build";
}

#[async_trait]
impl Task for DebianBuild {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let workspace = worker.require_workspace()?.to_path_buf();
        let mut docker = worker.ensure_image(Self::NAME).await?;
        docker.mount(workspace.clone(), CONTAINER_ROOT);

        let options = worker
            .config()
            .run_options()
            .with_workdir(format!("{CONTAINER_ROOT}/dirty"));
        let code = docker
            .run(&["dpkg-buildpackage", "--build=binary", "--no-sign"], &options)
            .await?;

        if code != 0 {
            let output = docker.read_log().await?;
            return Err(command_failure(
                Level::Error,
                "Package build failed",
                "dpkg-buildpackage",
                code,
                &output,
            )?
            .into());
        }

        let (name, description, file_name) = {
            let context = worker.context();
            let name = debian_package_name(&context);
            let file_name = format!(
                "{name}_{}_{}.{}",
                context.version,
                context.architecture,
                PackageKind::Deb.extension()
            );
            (name, context.name_human().to_string(), file_name)
        };

        let Some(built) = find_archive(&workspace, &name).await? else {
            return Err(Log::error("Build produced no package")
                .with_body("`dpkg-buildpackage` succeeded but no `.deb` file was written.")
                .into());
        };

        let target = workspace.join(file_name);
        if built != target {
            tokio::fs::rename(&built, &target).await?;
        }
        info!(package = %target.display(), "Package built");

        worker.context_mut().package = Some(Package {
            path: target,
            name,
            description,
            kind: PackageKind::Deb,
        });
        Ok(())
    }
}

/// Unpacks the built package into `package/`.
pub struct DebianExtract;

impl DebianExtract {
    pub const NAME: &'static str = "debian-extract";
}

#[async_trait]
impl Task for DebianExtract {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let Some(package) = worker.context().package.clone() else {
            debug!("No package built, nothing to extract");
            return Ok(());
        };
        let workspace = worker.require_workspace()?.to_path_buf();
        let Ok(relative) = package.path.strip_prefix(&workspace) else {
            return Err(Log::error("Package outside workspace")
                .with_body(format!(
                    "`{}` is not inside the workspace and cannot be extracted.",
                    package.path.display()
                ))
                .into());
        };

        let staged = workspace.join("package");
        match tokio::fs::remove_dir_all(&staged).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut docker = worker.ensure_image(Self::NAME).await?;
        docker.mount(workspace.clone(), CONTAINER_ROOT);

        let archive = format!("{CONTAINER_ROOT}/{}", relative.display());
        let destination = format!("{CONTAINER_ROOT}/package");
        let code = docker
            .run(
                &["dpkg-deb", "--extract", &archive, &destination],
                &worker.config().run_options(),
            )
            .await?;

        if code != 0 {
            let output = docker.read_log().await?;
            return Err(command_failure(
                Level::Error,
                "Package extraction failed",
                "dpkg-deb",
                code,
                &output,
            )?
            .into());
        }
        Ok(())
    }
}
