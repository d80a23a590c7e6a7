//! File-based storage backend.

use crate::backend::{alloc_buffer, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to a file name for the staging copy written by
/// [`FileBackend::replace`].
pub const TEMP_SUFFIX: &str = ".tmp";

/// A file-based storage backend.
///
/// The backend never opens its file for writing. Reads go through a cached
/// read-only handle; [`StorageBackend::replace`] writes a sibling file
/// (`<name>.tmp`), syncs it, and renames it over the target. A crash at any
/// point leaves either the old or the new content in place, never a mix.
///
/// # Example
///
/// ```no_run
/// use tickshift_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::new(Path::new("snapshotTxStatusData"));
/// let bytes = backend.read_all().unwrap();
/// backend.replace(&bytes).unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    reader: Mutex<Option<File>>,
}

impl FileBackend {
    /// Creates a backend for `path`. The file does not need to exist yet.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: Mutex::new(None),
        }
    }

    /// Creates a backend for an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist, or an
    /// I/O error if it cannot be opened for reading.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let backend = Self::new(path);
        {
            let mut reader = backend.reader.lock();
            *reader = Some(backend.open_reader()?);
        }
        Ok(backend)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the staging file used by `replace`.
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    fn open_reader(&self) -> StorageResult<File> {
        File::open(&self.path).map_err(|e| self.map_open_error(e))
    }

    fn map_open_error(&self, e: io::Error) -> StorageError {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                location: self.location(),
            }
        } else {
            StorageError::Io(e)
        }
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn write_staged(&self, temp: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp)?;
        file.write_all(data)?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut reader = self.reader.lock();
        if reader.is_none() {
            *reader = Some(self.open_reader()?);
        }
        let Some(file) = reader.as_mut() else {
            return Err(StorageError::NotFound {
                location: self.location(),
            });
        };

        let size = file.metadata()?.len();
        let end = offset.saturating_add(len as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = alloc_buffer(len)?;
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn size(&self) -> StorageResult<u64> {
        let metadata = fs::metadata(&self.path).map_err(|e| self.map_open_error(e))?;
        Ok(metadata.len())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp = self.temp_path();

        if let Err(e) = self.write_staged(&temp, data) {
            let _ = fs::remove_file(&temp);
            return Err(StorageError::Io(e));
        }

        // Drop the cached handle before the rename; it refers to the old inode.
        self.reader.lock().take();

        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(StorageError::Io(e));
        }

        Ok(())
    }

    fn available_space(&self) -> StorageResult<Option<u64>> {
        Ok(Some(fs2::available_space(self.parent_dir())?))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_new_does_not_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");

        let backend = FileBackend::new(&path);
        assert!(!backend.exists());
        assert!(!path.exists());
        assert!(matches!(backend.size(), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn file_open_missing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let result = FileBackend::open(&path);
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn file_replace_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");

        let mut backend = FileBackend::new(&path);
        backend.replace(b"hello world").unwrap();

        assert!(backend.exists());
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_all().unwrap(), b"hello world");
        assert_eq!(backend.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn file_replace_shrinks_and_grows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let mut backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 64);

        backend.replace(&[1u8; 16]).unwrap();
        assert_eq!(backend.read_all().unwrap(), vec![1u8; 16]);

        backend.replace(&[2u8; 128]).unwrap();
        assert_eq!(backend.read_all().unwrap(), vec![2u8; 128]);
    }

    #[test]
    fn file_replace_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");

        let mut backend = FileBackend::new(&path);
        backend.replace(b"data").unwrap();

        assert!(!backend.temp_path().exists());
        assert_eq!(
            backend.temp_path().file_name().unwrap().to_str().unwrap(),
            "state.db.tmp"
        );
    }

    #[test]
    fn file_replace_into_missing_dir_keeps_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("state.db");

        let mut backend = FileBackend::new(&path);
        assert!(backend.replace(b"data").is_err());
        assert!(!backend.exists());
    }

    #[test]
    fn file_read_past_end_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        std::fs::write(&path, b"hello").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        let result = backend.read_at(3, 5);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn file_empty_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        std::fs::write(&path, b"hello").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.read_at(2, 0).unwrap().is_empty());
    }

    #[test]
    fn file_available_space_reported() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(&dir.path().join("state.db"));
        assert!(backend.available_space().unwrap().is_some());
    }

    #[test]
    fn file_relative_path_parent() {
        let backend = FileBackend::new(Path::new("state.db"));
        assert_eq!(backend.parent_dir(), PathBuf::from("."));
        assert_eq!(backend.location(), "state.db");
    }
}
