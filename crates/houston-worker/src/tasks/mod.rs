//! Built-in tasks and the standard pipelines.

mod debian;
mod file;
mod upload;
mod validate;

use std::io;
use std::path::Path;

use houston_types::{Level, Log};
use serde_json::json;

pub use debian::{
    DebianBuild, DebianChangelog, DebianControl, DebianExtract, debian_package_name,
    render_changelog,
};
pub use file::{PackageFile, PackageFileCheck, list_files};
pub use upload::{UploadLog, UploadPackage};
pub use validate::{AppstreamValidate, DesktopValidate};

use crate::composite::{ParallelTask, WrapperTask};
use crate::error::TaskResult;
use crate::task::{TaskConstructor, constructor};

/// Where sandboxed tasks see the host directory they mount.
pub(crate) const CONTAINER_ROOT: &str = "/tmp/houston";

/// Packaging steps, strictly in order.
pub fn debian_tasks() -> Vec<TaskConstructor> {
    vec![
        constructor(|| DebianChangelog),
        constructor(|| DebianControl),
        constructor(|| DebianBuild),
        constructor(|| DebianExtract),
    ]
}

/// Presence checks on the staged install root.
pub fn file_tasks() -> Vec<TaskConstructor> {
    vec![
        constructor(PackageFileCheck::binary),
        constructor(PackageFileCheck::desktop),
        constructor(PackageFileCheck::appdata),
    ]
}

/// Validators run against the staged metadata files.
pub fn validation_tasks() -> Vec<TaskConstructor> {
    vec![
        constructor(|| DesktopValidate),
        constructor(|| AppstreamValidate),
    ]
}

/// The top-level tasks a worker runs unless told otherwise.
pub fn default_pipeline() -> Vec<TaskConstructor> {
    vec![
        constructor(|| WrapperTask::new("debian", debian_tasks())),
        constructor(|| ParallelTask::new("files", file_tasks())),
        constructor(|| ParallelTask::new("validate", validation_tasks())),
    ]
}

/// Tasks run by `Worker::upload`.
pub fn upload_pipeline() -> Vec<TaskConstructor> {
    vec![constructor(|| UploadPackage), constructor(|| UploadLog)]
}

/// Replace `path` with `content` through a sibling temp file.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.houston-tmp"));

    tokio::fs::write(&temp, content).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

const COMMAND_FAILURE: &str =
    "`{{ program }}` exited with status {{ exit_code }}.\n\n```\n{{ output }}\n```";

/// Log for a sandboxed command that exited non-zero, quoting its output.
pub(crate) fn command_failure(
    level: Level,
    title: &str,
    program: &str,
    code: i32,
    output: &str,
) -> TaskResult<Log> {
    let data = json!({
        "program": program,
        "exit_code": code,
        "output": output.trim_end(),
    });
    Ok(Log::templated(level, title, COMMAND_FAILURE, data)?)
}
