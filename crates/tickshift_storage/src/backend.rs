//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A whole-file byte store.
///
/// Backends are **opaque byte stores**. They read content, report its size,
/// and replace it as a single unit. The migration driver owns all layout
/// interpretation - backends do not know about regions or capacities.
///
/// # Invariants
///
/// - `read_at` returns exactly the bytes at that offset of the current content
/// - after `replace` returns successfully, `read_all` returns the new content
///   and that content is durable
/// - a failed `replace` leaves the previous content untouched
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The content does not exist
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Returns the current size of the content in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if there is no content yet.
    fn size(&self) -> StorageResult<u64>;

    /// Returns true if the backend currently holds content.
    fn exists(&self) -> bool;

    /// Atomically replaces the whole content with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be written. The previous
    /// content, if any, is left as it was.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the number of bytes that can still be written at this
    /// location, or `None` if the backend has no meaningful limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the free space cannot be queried.
    fn available_space(&self) -> StorageResult<Option<u64>>;

    /// Human-readable location used in logs and error messages.
    fn location(&self) -> String;

    /// Reads the whole content into a freshly allocated buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be allocated or read.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| StorageError::TooLarge { size })?;
        self.read_at(0, len)
    }
}

/// Allocates a zeroed buffer of `len` bytes without aborting on failure.
///
/// State files reach the gigabyte range, so an allocation failure has to
/// surface as [`StorageError::OutOfMemory`] rather than abort the process.
pub(crate) fn alloc_buffer(len: usize) -> StorageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| StorageError::OutOfMemory {
            requested: len as u64,
        })?;
    buffer.resize(len, 0);
    Ok(buffer)
}
