//! The build context threaded through every task of a run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::log::Log;
use crate::naming::sanitize;

/// Mutable record describing one build/validation run.
///
/// Identity and build coordinates are set by the caller before the worker
/// exists; tasks only append to the accumulated results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Reverse-domain identifier, the canonical key.
    pub name_domain: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    name_appstream: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    name_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name_developer: Option<String>,

    pub architecture: String,
    pub distribution: String,
    pub package_system: String,
    pub version: String,
    /// Source-control refs to merge, most specific last.
    pub references: Vec<String>,

    #[serde(default)]
    pub changelog: Vec<ChangelogEntry>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub package: Option<Package>,
}

impl Context {
    pub fn new(name_domain: impl Into<String>) -> Self {
        Self {
            name_domain: name_domain.into(),
            name_appstream: None,
            name_human: None,
            name_developer: None,
            architecture: "amd64".to_string(),
            distribution: "loki".to_string(),
            package_system: "deb".to_string(),
            version: "0.0.1".to_string(),
            references: Vec::new(),
            changelog: Vec::new(),
            logs: Vec::new(),
            package: None,
        }
    }

    pub fn with_appstream_name(mut self, name: impl Into<String>) -> Self {
        self.name_appstream = Some(name.into());
        self
    }

    pub fn with_human_name(mut self, name: impl Into<String>) -> Self {
        self.name_human = Some(name.into());
        self
    }

    pub fn with_developer(mut self, name: impl Into<String>) -> Self {
        self.name_developer = Some(name.into());
        self
    }

    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    pub fn with_distribution(mut self, distribution: impl Into<String>) -> Self {
        self.distribution = distribution.into();
        self
    }

    pub fn with_package_system(mut self, package_system: impl Into<String>) -> Self {
        self.package_system = package_system.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_changelog(mut self, changelog: Vec<ChangelogEntry>) -> Self {
        self.changelog = changelog;
        self
    }

    /// AppStream id; `<name_domain>.desktop` unless overridden.
    pub fn name_appstream(&self) -> String {
        self.name_appstream
            .clone()
            .unwrap_or_else(|| format!("{}.desktop", self.name_domain))
    }

    /// Human readable name, falling back to the last domain segment.
    pub fn name_human(&self) -> &str {
        match &self.name_human {
            Some(name) => name,
            None => self
                .name_domain
                .rsplit('.')
                .next()
                .unwrap_or(&self.name_domain),
        }
    }

    /// The domain name as used for installed file names.
    pub fn name_sanitized(&self) -> String {
        sanitize(&self.name_domain)
    }

    /// Final path segment of each reference (`refs/heads/loki` -> `loki`).
    pub fn short_references(&self) -> Vec<&str> {
        self.references.iter().map(|r| short_reference(r)).collect()
    }
}

/// Final path segment of a git reference name.
pub fn short_reference(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// One released version in the application's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub author: String,
    pub date: DateTime<Utc>,
    pub version: String,
    pub changes: Vec<String>,
}

/// Package format produced by the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Deb,
}

impl PackageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            PackageKind::Deb => "deb",
        }
    }
}

/// A built package, present only after the packaging stage succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub path: PathBuf,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: PackageKind,
}

/// One cell of the build matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildTarget {
    pub architecture: String,
    pub distribution: String,
    pub package_type: String,
}

impl BuildTarget {
    pub fn new(
        architecture: impl Into<String>,
        distribution: impl Into<String>,
        package_type: impl Into<String>,
    ) -> Self {
        Self {
            architecture: architecture.into(),
            distribution: distribution.into(),
            package_type: package_type.into(),
        }
    }
}
