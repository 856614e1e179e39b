//! Name-to-constructor mapping for building pipelines from configuration.

use std::collections::HashMap;

use crate::composite::{ParallelTask, WrapperTask};
use crate::error::{Result, WorkerError};
use crate::task::{TaskConstructor, constructor};
use crate::tasks::{
    AppstreamValidate, DebianBuild, DebianChangelog, DebianControl, DebianExtract,
    DesktopValidate, PackageFile, PackageFileCheck, UploadLog, UploadPackage, debian_tasks,
    file_tasks, validation_tasks,
};

/// Explicit registry of task constructors, keyed by stable name.
#[derive(Default, Clone)]
pub struct TaskRegistry {
    constructors: HashMap<String, TaskConstructor>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in task and the standard composites
    /// `debian`, `files` and `validate`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DebianChangelog::NAME, constructor(|| DebianChangelog));
        registry.register(DebianControl::NAME, constructor(|| DebianControl));
        registry.register(DebianBuild::NAME, constructor(|| DebianBuild));
        registry.register(DebianExtract::NAME, constructor(|| DebianExtract));
        for file in [PackageFile::Binary, PackageFile::Desktop, PackageFile::AppData] {
            registry.register(file.task_name(), constructor(move || PackageFileCheck::new(file)));
        }
        registry.register(DesktopValidate::NAME, constructor(|| DesktopValidate));
        registry.register(AppstreamValidate::NAME, constructor(|| AppstreamValidate));
        registry.register(UploadPackage::NAME, constructor(|| UploadPackage));
        registry.register(UploadLog::NAME, constructor(|| UploadLog));

        registry.register(
            "debian",
            constructor(|| WrapperTask::new("debian", debian_tasks())),
        );
        registry.register(
            "files",
            constructor(|| ParallelTask::new("files", file_tasks())),
        );
        registry.register(
            "validate",
            constructor(|| ParallelTask::new("validate", validation_tasks())),
        );
        registry
    }

    /// Register `build` under `name`, returning any constructor it replaces.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        build: TaskConstructor,
    ) -> Option<TaskConstructor> {
        self.constructors.insert(name.into(), build)
    }

    pub fn get(&self, name: &str) -> Option<TaskConstructor> {
        self.constructors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve `names` in order. Fails on the first unknown name.
    pub fn build(&self, names: &[&str]) -> Result<Vec<TaskConstructor>> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| WorkerError::UnknownTask(name.to_string()))
            })
            .collect()
    }

    /// A sequential composite over registered `children`.
    pub fn wrapper(&self, name: &str, children: &[&str]) -> Result<TaskConstructor> {
        let name = name.to_string();
        let children = self.build(children)?;
        Ok(constructor(move || WrapperTask::new(name.clone(), children.clone())))
    }

    /// A concurrent composite over registered `children`.
    pub fn parallel(&self, name: &str, children: &[&str]) -> Result<TaskConstructor> {
        let name = name.to_string();
        let children = self.build(children)?;
        Ok(constructor(move || ParallelTask::new(name.clone(), children.clone())))
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}
