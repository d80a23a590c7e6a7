//! Error types for tickshift core.

use std::io;
use thiserror::Error;
use tickshift_storage::StorageError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while planning, resizing or verifying a state file.
///
/// Every variant is fatal to the current run. Data loss on truncation is
/// not an error; it is reported through
/// [`ResizeOutcome`](crate::ResizeOutcome).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The tick duration cannot be turned into a capacity.
    #[error("invalid duration: {duration_ms} ms: {reason}")]
    InvalidDuration {
        /// The rejected duration in milliseconds.
        duration_ms: u64,
        /// Why it was rejected.
        reason: String,
    },

    /// A region length, offset or the total length does not fit.
    #[error("layout overflow: {family} at capacity {capacity}: {message}")]
    LayoutOverflow {
        /// File family being instantiated.
        family: &'static str,
        /// Capacity that overflowed.
        capacity: u64,
        /// Which computation overflowed.
        message: String,
    },

    /// The input length does not match the layout for the stated capacity.
    #[error(
        "corrupt input: {location}: expected {expected} bytes for {family} at capacity \
         {capacity}, found {actual} ({difference:+} bytes)"
    )]
    CorruptInput {
        /// Where the input came from.
        location: String,
        /// File family expected.
        family: &'static str,
        /// Capacity the length was computed for.
        capacity: u64,
        /// Expected length in bytes.
        expected: u64,
        /// Actual length in bytes.
        actual: u64,
        /// `actual - expected`.
        difference: i128,
    },

    /// Old and new layouts do not describe the same file family.
    #[error("layout mismatch: {location}: {message}")]
    LayoutMismatch {
        /// Where the mismatch was found.
        location: String,
        /// Description of the mismatch.
        message: String,
    },

    /// A shrunk array would end in the middle of an element.
    #[error(
        "misaligned truncation: {location}: region {region} cut to {new_length} bytes, \
         not a multiple of element size {element_size}"
    )]
    MisalignedTruncation {
        /// Where the truncation was attempted.
        location: String,
        /// Region being truncated.
        region: &'static str,
        /// Requested new length in bytes.
        new_length: u64,
        /// Element size of the region.
        element_size: u64,
    },

    /// The written output does not match what was expected.
    #[error("verification failed: {location}: {message}")]
    VerificationFailed {
        /// Output location.
        location: String,
        /// What disagreed.
        message: String,
    },

    /// Not enough memory or disk space to run the transform.
    #[error(
        "insufficient resources: {resource} at {location}: need {needed} bytes, \
         {available} available"
    )]
    InsufficientResources {
        /// `memory` or `disk`.
        resource: &'static str,
        /// Where the resource was needed.
        location: String,
        /// Bytes required.
        needed: u64,
        /// Bytes available.
        available: u64,
    },

    /// The backup copy could not be made.
    #[error("backup failed: {location}: {message}")]
    BackupFailed {
        /// Backup location.
        location: String,
        /// Why it failed.
        message: String,
    },

    /// The resized output could not be written.
    #[error("write failed: {location}: {source}")]
    WriteFailed {
        /// Output location.
        location: String,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },
}

impl CoreError {
    /// Creates an invalid duration error.
    pub fn invalid_duration(duration_ms: u64, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            duration_ms,
            reason: reason.into(),
        }
    }

    /// Creates a layout overflow error.
    pub fn layout_overflow(
        family: &'static str,
        capacity: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::LayoutOverflow {
            family,
            capacity,
            message: message.into(),
        }
    }

    /// Creates a corrupt input error for a length mismatch.
    pub fn corrupt_input(
        location: impl Into<String>,
        family: &'static str,
        capacity: u64,
        expected: u64,
        actual: u64,
    ) -> Self {
        Self::CorruptInput {
            location: location.into(),
            family,
            capacity,
            expected,
            actual,
            difference: i128::from(actual) - i128::from(expected),
        }
    }

    /// Creates a layout mismatch error.
    pub fn layout_mismatch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LayoutMismatch {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Rebinds a layout error to the file it was raised for.
    ///
    /// Layout checks run on descriptors and buffers and only know the family
    /// name. Other variants are returned unchanged.
    #[must_use]
    pub fn at(self, location: impl Into<String>) -> Self {
        match self {
            Self::LayoutMismatch { message, .. } => Self::LayoutMismatch {
                location: location.into(),
                message,
            },
            Self::MisalignedTruncation {
                region,
                new_length,
                element_size,
                ..
            } => Self::MisalignedTruncation {
                location: location.into(),
                region,
                new_length,
                element_size,
            },
            other => other,
        }
    }

    /// Creates a verification failed error.
    pub fn verification_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Creates a backup failed error.
    pub fn backup_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackupFailed {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Short name of the failure kind, as shown to operators.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(_) => "StorageError",
            Self::Io(_) => "IoError",
            Self::InvalidDuration { .. } => "InvalidDuration",
            Self::LayoutOverflow { .. } => "LayoutOverflow",
            Self::CorruptInput { .. } => "CorruptInput",
            Self::LayoutMismatch { .. } => "LayoutMismatch",
            Self::MisalignedTruncation { .. } => "MisalignedTruncation",
            Self::VerificationFailed { .. } => "VerificationFailed",
            Self::InsufficientResources { .. } => "InsufficientResources",
            Self::BackupFailed { .. } => "BackupFailed",
            Self::WriteFailed { .. } => "WriteFailed",
        }
    }
}
