use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by snapshot storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The slot could not be read or written (missing directory, disk full, permissions).
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend refused the write because it is over its quota.
    #[error("storage quota exceeded for slot `{key}`")]
    QuotaExceeded {
        /// Slot that was being written.
        key: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
