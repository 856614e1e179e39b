//! Leveled report units.
//!
//! A [`Log`] is both a line in the user-facing report and the value a task
//! returns to signal an expected, reportable failure. Anything that is not a
//! `Log` is an infrastructure failure and is handled elsewhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::template::render_template;

/// Severity of a [`Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Uppercase label used in rendered reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable report unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub level: Level,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
}

impl Log {
    /// Create a log with an empty body.
    pub fn new(level: Level, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: String::new(),
            data: None,
        }
    }

    pub fn debug(title: impl Into<String>) -> Self {
        Self::new(Level::Debug, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(Level::Info, title)
    }

    pub fn warn(title: impl Into<String>) -> Self {
        Self::new(Level::Warn, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(Level::Error, title)
    }

    /// Create a log whose body is rendered from a `{{ ... }}` template.
    ///
    /// The `data` value is both the template input and the attached data.
    /// Rendering fails if the template references a path missing from `data`.
    pub fn templated(
        level: Level,
        title: impl Into<String>,
        template: &str,
        data: Value,
    ) -> Result<Self> {
        let body = render_template(template, &data)?;
        Ok(Self {
            level,
            title: title.into(),
            body,
            data: Some(data),
        })
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// Render as a markdown issue: `# title` followed by the body.
    pub fn to_markdown(&self) -> String {
        if self.body.trim().is_empty() {
            format!("# {}\n", self.title)
        } else {
            format!("# {}\n\n{}\n", self.title, self.body.trim_end())
        }
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.title)
    }
}

impl std::error::Error for Log {}
