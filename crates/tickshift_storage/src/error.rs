//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file does not exist.
    #[error("not found: {location}")]
    NotFound {
        /// Where the content was expected.
        location: String,
    },

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// A buffer of the requested size could not be allocated.
    #[error("cannot allocate {requested} bytes")]
    OutOfMemory {
        /// Number of bytes requested.
        requested: u64,
    },

    /// The content is larger than this platform can address in memory.
    #[error("content of {size} bytes exceeds addressable memory")]
    TooLarge {
        /// The content size.
        size: u64,
    },

    /// The backend refuses writes.
    #[error("storage is read-only: {location}")]
    ReadOnly {
        /// The backend location.
        location: String,
    },
}
