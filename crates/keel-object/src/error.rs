//! Object model error types.

use thiserror::Error;

/// Errors that can occur while constructing, parsing, or validating objects.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// A digest source had the wrong length or characters.
    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    /// An object failed structural parsing or format validation.
    #[error("object format error: {0}")]
    Format(String),

    /// The requested object is not present in the store.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for object model operations.
pub type Result<T> = std::result::Result<T, ObjectError>;
