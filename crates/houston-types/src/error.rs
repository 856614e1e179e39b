//! Error types for shared Houston types.

use thiserror::Error;

/// Result type alias using the types error.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors raised while building shared values.
#[derive(Debug, Error)]
pub enum TypesError {
    /// A `{{ ... }}` expression referenced data that does not exist.
    #[error("Template '{{{{{expression}}}}}': {message}")]
    Template { expression: String, message: String },
}
