//! Error types for vector store operations.

use thiserror::Error;

/// Errors raised by [`VectorStore`] implementations.
///
/// Store unavailability is a transport error from the pipeline's point of
/// view: the coordinator surfaces it immediately and aborts the run rather
/// than silently degrading.
///
/// [`VectorStore`]: crate::VectorStore
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database could not be opened or reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A write failed after the store was opened.
    #[error("Write failed for {key}: {message}")]
    WriteFailed {
        /// Composite key of the failed write
        key: String,
        /// Backend error description
        message: String,
    },

    /// Stored bytes could not be decoded back into a vector or annotation.
    #[error("Corrupt entry at {key}: {message}")]
    Corrupt {
        /// Composite key of the corrupt entry
        key: String,
        /// Decoding failure description
        message: String,
    },

    /// Serialization of a vector or annotation list failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
