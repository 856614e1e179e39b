//! Presence checks on the staged install root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use houston_types::{Context, Log};
use serde_json::json;
use tokio::task;
use walkdir::WalkDir;

use crate::error::TaskResult;
use crate::task::Task;
use crate::worker::Worker;

/// A file every package must install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFile {
    /// `usr/bin/<sanitized domain>`
    Binary,
    /// `usr/share/applications/<sanitized domain>.desktop`
    Desktop,
    /// `usr/share/metainfo/<domain>.appdata.xml`
    AppData,
}

impl PackageFile {
    pub fn task_name(&self) -> &'static str {
        match self {
            PackageFile::Binary => "file-binary",
            PackageFile::Desktop => "file-desktop",
            PackageFile::AppData => "file-appdata",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            PackageFile::Binary => "Executable file not found",
            PackageFile::Desktop => "Desktop file not found",
            PackageFile::AppData => "AppData file not found",
        }
    }

    /// Location relative to the install root.
    pub fn relative_path(&self, context: &Context) -> PathBuf {
        match self {
            PackageFile::Binary => Path::new("usr/bin").join(context.name_sanitized()),
            PackageFile::Desktop => Path::new("usr/share/applications")
                .join(format!("{}.desktop", context.name_sanitized())),
            PackageFile::AppData => Path::new("usr/share/metainfo")
                .join(format!("{}.appdata.xml", context.name_domain)),
        }
    }
}

/// Every file under `root`, relative and sorted. Empty if `root` is missing.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

fn missing_body(expected: &Path, present: &[String]) -> String {
    let mut body = format!("Expected `{}` to exist in the package.\n\n", expected.display());
    if present.is_empty() {
        body.push_str("The package contains no files.");
    } else {
        body.push_str("The package contains:\n");
        for file in present {
            body.push_str(&format!("\n- `{file}`"));
        }
    }
    body
}

/// Fails with an ERROR log when its [`PackageFile`] is not staged.
pub struct PackageFileCheck {
    file: PackageFile,
}

impl PackageFileCheck {
    pub fn new(file: PackageFile) -> Self {
        Self { file }
    }

    pub fn binary() -> Self {
        Self::new(PackageFile::Binary)
    }

    pub fn desktop() -> Self {
        Self::new(PackageFile::Desktop)
    }

    pub fn appdata() -> Self {
        Self::new(PackageFile::AppData)
    }
}

#[async_trait]
impl Task for PackageFileCheck {
    fn name(&self) -> &str {
        self.file.task_name()
    }

    async fn run(&self, worker: &Worker) -> TaskResult<()> {
        let root = worker.require_workspace()?.join("package");
        let expected = self.file.relative_path(&worker.context());

        let found = tokio::fs::metadata(root.join(&expected))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if found {
            return Ok(());
        }

        let present = task::spawn_blocking(move || list_files(&root)).await?;
        Err(Log::error(self.file.title())
            .with_body(missing_body(&expected, &present))
            .with_data(json!({ "expected": expected, "files": present }))
            .into())
    }
}
