//! Repository capability contracts for the Houston worker.
//!
//! A repository adapter may offer any subset of three independent
//! capabilities:
//!
//! | capability           | trait                | used by                |
//! |----------------------|----------------------|------------------------|
//! | clone / list refs    | [`SourceControl`]    | workspace setup        |
//! | publish packages     | [`PackagePublisher`] | package upload task    |
//! | publish logs         | [`LogPublisher`]     | log upload task        |
//!
//! [`Repository`] is the discovery surface: each accessor returns the
//! capability when the adapter implements it and `None` otherwise, so
//! callers can skip absent capabilities without treating them as errors.

pub mod capability;
pub mod error;
pub mod git;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use capability::{LogPublisher, PackagePublisher, Repository, SourceControl};
pub use error::{RepositoryError, RepositoryResult};
pub use git::GitRepository;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryRepository;
