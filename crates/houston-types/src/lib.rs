//! Shared types for the Houston worker.
//!
//! Everything a build run threads through its tasks lives here: the mutable
//! [`Context`], the leveled [`Log`] report unit, and the small value types
//! that describe packages and build targets.

pub mod context;
pub mod error;
pub mod log;
pub mod naming;
pub mod template;

pub use context::{BuildTarget, ChangelogEntry, Context, Package, PackageKind, short_reference};
pub use error::{Result, TypesError};
pub use log::{Level, Log};
pub use naming::sanitize;
pub use template::render_template;
