//! # tickshift Storage
//!
//! Whole-file byte stores used by the tickshift migration driver.
//!
//! Storage backends are **opaque byte stores** - they do not interpret
//! the state files they hold. Layout knowledge lives in `tickshift_core`.
//!
//! ## Design Principles
//!
//! - A backend holds exactly one file's bytes (or nothing, if it does not exist yet)
//! - Content is replaced as a whole, never patched in place
//! - Replacement is atomic for file backends: temp sibling, fsync, rename
//! - Must be `Send + Sync`
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing, including injected write failures
//! - [`FileBackend`] - For state files on disk
//!
//! ## Example
//!
//! ```rust
//! use tickshift_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::empty("scratch");
//! backend.replace(b"hello world").unwrap();
//! let data = backend.read_at(6, 5).unwrap();
//! assert_eq!(&data, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, TEMP_SUFFIX};
pub use memory::InMemoryBackend;
