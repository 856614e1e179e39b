//! User-facing aggregation of reported logs.

use std::fmt;

use houston_types::{Level, Log};
use serde::Serialize;

/// Itemized issues plus error/warning counts for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    logs: Vec<Log>,
}

impl Report {
    pub fn new(logs: Vec<Log>) -> Self {
        Self { logs }
    }

    /// Every reported log, in report order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// WARN and ERROR logs, in report order.
    pub fn issues(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter().filter(|log| log.level >= Level::Warn)
    }

    pub fn error_count(&self) -> usize {
        self.count(Level::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Level::Warn)
    }

    pub fn passes(&self) -> bool {
        self.error_count() == 0
    }

    fn count(&self, level: Level) -> usize {
        self.logs.iter().filter(|log| log.level == level).count()
    }

    /// Summary line followed by one markdown section per issue.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("{self}\n");
        for issue in self.issues() {
            out.push('\n');
            out.push_str(&issue.to_markdown());
        }
        out
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}",
            plural(self.error_count(), "error"),
            plural(self.warning_count(), "warning")
        )
    }
}
