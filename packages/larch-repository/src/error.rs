//! Repository-level error type.

use larch_store::{ErrorKind, StorageError};
use thiserror::Error;

/// Errors surfaced by the repository services.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Propagated storage failure (index, blob or version backend).
    #[error(transparent)]
    Store(#[from] StorageError),

    /// A caller-supplied value failed boundary validation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Entity (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    /// The storage-level kind behind this error, where one applies.
    /// Boundary validation maps to `InvalidParameter`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Store(err) => err.kind,
            RepositoryError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            RepositoryError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
