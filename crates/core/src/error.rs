//! Error types for s3fs-core
//!
//! [`Error`] is what callers of the retry executor observe: either the last
//! backend failure unchanged, or a filesystem-style error it was remapped to.

use thiserror::Error;

use crate::backend_error::BackendError;

/// Result type alias for s3fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by s3fs operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The last backend failure, not remapped
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Operation aborted: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// The backend does not implement the requested capability
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The unmapped backend failure, if this error is one
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Error::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("TOML parse error: {e}"))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(format!("TOML serialize error: {e}"))
    }
}
