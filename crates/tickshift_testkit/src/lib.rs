//! # tickshift Testkit
//!
//! Test utilities for tickshift.
//!
//! This crate provides:
//! - Synthetic state files with small page geometry
//! - Temporary on-disk state files with backup paths
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use tickshift_testkit::prelude::*;
//!
//! let data = tx_status_file(100, 195..200);
//! let file = TempStateFile::new("snapshotTxStatusData", &data);
//! assert_eq!(file.read().len(), 1608);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
