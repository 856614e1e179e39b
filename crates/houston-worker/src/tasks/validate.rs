//! Metadata validators run inside the sandbox.

use async_trait::async_trait;
use houston_types::Level;
use tracing::debug;

use super::{CONTAINER_ROOT, PackageFile, command_failure};
use crate::error::TaskResult;
use crate::task::Task;
use crate::worker::Worker;

/// Run `program <staged file>` in the `image` sandbox.
///
/// A file that was never staged is skipped; the presence checks report it.
async fn validate(
    worker: &Worker,
    image: &str,
    file: PackageFile,
    program: &[&str],
    level: Level,
    title: &str,
) -> TaskResult<()> {
    let root = worker.require_workspace()?.join("package");
    let relative = file.relative_path(&worker.context());
    if !tokio::fs::try_exists(root.join(&relative)).await? {
        debug!(task = image, file = %relative.display(), "Nothing to validate");
        return Ok(());
    }

    let mut docker = worker.ensure_image(image).await?;
    docker.mount(root, CONTAINER_ROOT);

    let target = format!("{CONTAINER_ROOT}/{}", relative.display());
    let mut args = program.to_vec();
    args.push(&target);
    let code = docker.run(&args, &worker.config().run_options()).await?;
    if code == 0 {
        return Ok(());
    }

    let output = docker.read_log().await?;
    Err(command_failure(level, title, program[0], code, &output)?.into())
}

/// `desktop-file-validate` on the staged desktop entry. Failures are errors.
pub struct DesktopValidate;

impl DesktopValidate {
    pub const NAME: &'static str = "desktop-validate";
}

#[async_trait]
impl Task for DesktopValidate {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        validate(
            worker,
            Self::NAME,
            PackageFile::Desktop,
            &["desktop-file-validate"],
            Level::Error,
            "Desktop file validation failed",
        )
        .await
    }
}

/// `appstreamcli validate` on the staged AppData file. Failures are warnings.
pub struct AppstreamValidate;

impl AppstreamValidate {
    pub const NAME: &'static str = "appstream-validate";
}

#[async_trait]
impl Task for AppstreamValidate {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        validate(
            worker,
            Self::NAME,
            PackageFile::AppData,
            &["appstreamcli", "validate", "--no-net"],
            Level::Warn,
            "AppStream validation failed",
        )
        .await
    }
}
