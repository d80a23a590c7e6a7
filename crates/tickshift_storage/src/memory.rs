//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// Holds the content in a `Vec<u8>`, or nothing if the content has not been
/// written yet. Suitable for:
/// - Unit tests of the migration driver
/// - Simulating a full disk ([`InMemoryBackend::with_space_limit`])
/// - Simulating a failing device ([`InMemoryBackend::read_only`])
///
/// # Example
///
/// ```rust
/// use tickshift_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::with_data("input", vec![1, 2, 3]);
/// assert_eq!(backend.size().unwrap(), 3);
/// ```
#[derive(Debug)]
pub struct InMemoryBackend {
    name: String,
    data: RwLock<Option<Vec<u8>>>,
    space_limit: Option<u64>,
    writable: bool,
}

impl InMemoryBackend {
    /// Creates a backend with no content.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(None),
            space_limit: None,
            writable: true,
        }
    }

    /// Creates a backend holding `data`.
    #[must_use]
    pub fn with_data(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(Some(data)),
            ..Self::empty(name)
        }
    }

    /// Limits the bytes reported by `available_space` and accepted by `replace`.
    #[must_use]
    pub fn with_space_limit(mut self, limit: u64) -> Self {
        self.space_limit = Some(limit);
        self
    }

    /// Makes every `replace` fail.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Returns a copy of the content, if any.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let guard = self.data.read();
        let Some(data) = guard.as_ref() else {
            return Err(StorageError::NotFound {
                location: self.location(),
            });
        };

        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        // Bounds checked above against a usize length.
        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn size(&self) -> StorageResult<u64> {
        self.data
            .read()
            .as_ref()
            .map(|d| d.len() as u64)
            .ok_or_else(|| StorageError::NotFound {
                location: self.location(),
            })
    }

    fn exists(&self) -> bool {
        self.data.read().is_some()
    }

    fn replace(&mut self, new_data: &[u8]) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                location: self.location(),
            });
        }
        if let Some(limit) = self.space_limit {
            if new_data.len() as u64 > limit {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("no space left: {} bytes over a {limit} byte limit", new_data.len()),
                )));
            }
        }
        *self.data.write() = Some(new_data.to_vec());
        Ok(())
    }

    fn available_space(&self) -> StorageResult<Option<u64>> {
        Ok(self.space_limit)
    }

    fn location(&self) -> String {
        format!("memory:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_empty_has_no_content() {
        let backend = InMemoryBackend::empty("out");
        assert!(!backend.exists());
        assert!(matches!(backend.size(), Err(StorageError::NotFound { .. })));
        assert!(matches!(
            backend.read_at(0, 0),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn memory_replace_and_read() {
        let mut backend = InMemoryBackend::empty("out");
        backend.replace(b"hello world").unwrap();

        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_all().unwrap(), b"hello world");
        assert_eq!(backend.read_at(0, 5).unwrap(), b"hello");
    }

    #[test]
    fn memory_read_past_end_fails() {
        let backend = InMemoryBackend::with_data("in", b"hello".to_vec());
        let result = backend.read_at(4, 2);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn memory_read_only_rejects_replace() {
        let mut backend = InMemoryBackend::with_data("in", vec![1, 2, 3]).read_only();
        assert!(matches!(
            backend.replace(b"x"),
            Err(StorageError::ReadOnly { .. })
        ));
        assert_eq!(backend.data(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn memory_space_limit() {
        let mut backend = InMemoryBackend::empty("out").with_space_limit(4);
        assert_eq!(backend.available_space().unwrap(), Some(4));
        assert!(backend.replace(b"12345").is_err());
        assert!(!backend.exists());
        backend.replace(b"1234").unwrap();
        assert!(backend.exists());
    }

    #[test]
    fn memory_location() {
        let backend = InMemoryBackend::empty("backup");
        assert_eq!(backend.location(), "memory:backup");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn read_at_matches_slice(
                data in prop::collection::vec(any::<u8>(), 0..256),
                offset in 0usize..300,
                len in 0usize..300,
            ) {
                let backend = InMemoryBackend::with_data("prop", data.clone());
                let result = backend.read_at(offset as u64, len);
                if offset + len <= data.len() {
                    prop_assert_eq!(result.unwrap(), data[offset..offset + len].to_vec());
                } else {
                    let is_past_end = matches!(result, Err(StorageError::ReadPastEnd { .. }));
                    prop_assert!(is_past_end);
                }
            }
        }
    }
}
