use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by a storage engine. Every variant reaches the caller as is;
/// nothing is retried at this layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The pool could not hand out a connection, or the engine was already closed.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Duplicate chat or duplicate subscription.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[source] BoxError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    ConnectionFailure,
    Conflict,
    StorageFailure,
    Cancelled,
    DeadlineExceeded,
}

impl StorageError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StorageError::StorageFailure(err.into())
    }

    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StorageError::ConnectionFailure(_) => StorageErrorKind::ConnectionFailure,
            StorageError::Conflict(_) => StorageErrorKind::Conflict,
            StorageError::StorageFailure(_) => StorageErrorKind::StorageFailure,
            StorageError::Cancelled => StorageErrorKind::Cancelled,
            StorageError::DeadlineExceeded => StorageErrorKind::DeadlineExceeded,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == StorageErrorKind::Conflict
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
