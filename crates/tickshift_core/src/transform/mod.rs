//! File transform driver.
//!
//! A transform moves one state file through these stages:
//!
//! ```text
//! Loaded -> Resized -> BackedUp (optional) -> Written -> Verified
//! ```
//!
//! Every check that can fail without side effects (length, disk space,
//! memory, an existing backup) runs before the first write. The input is
//! never opened for writing: the output is staged in a temp sibling and
//! renamed into place by the storage backend.

mod driver;
mod verify;

pub use driver::{transform_file, Transformer};
pub use verify::{verify_output, Fingerprints, RegionFingerprint, VerificationSummary};

use crate::layout::LayoutDescriptor;
use crate::resize::RegionChange;
use crate::types::{Capacity, TickDuration};
use serde::Serialize;
use std::fmt;

/// A stage of the transform, in the order they are passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStage {
    /// Input read and its length checked against the old layout.
    Loaded,
    /// Resized buffer built in memory.
    Resized,
    /// Original bytes copied to the backup location.
    BackedUp,
    /// Resized buffer written to the output location.
    Written,
    /// Output re-read and checked against the new layout.
    Verified,
}

impl fmt::Display for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loaded => "loaded",
            Self::Resized => "resized",
            Self::BackedUp => "backed up",
            Self::Written => "written",
            Self::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// Capacities and layouts for one transform, computed without touching
/// any file.
#[derive(Debug, Clone, Serialize)]
pub struct TransformPlan {
    /// File family name.
    pub family: &'static str,
    /// Tick duration the input was written with.
    pub old_duration: TickDuration,
    /// Tick duration the output is for.
    pub new_duration: TickDuration,
    /// Epoch capacity at the old duration.
    pub old_capacity: Capacity,
    /// Epoch capacity at the new duration.
    pub new_capacity: Capacity,
    /// Layout of the input.
    pub old_layout: LayoutDescriptor,
    /// Layout of the output.
    pub new_layout: LayoutDescriptor,
}

impl TransformPlan {
    /// Expected input length.
    #[must_use]
    pub const fn old_length(&self) -> u64 {
        self.old_layout.total_length()
    }

    /// Output length.
    #[must_use]
    pub const fn new_length(&self) -> u64 {
        self.new_layout.total_length()
    }

    /// `new_length - old_length`.
    #[must_use]
    pub fn size_delta(&self) -> i128 {
        i128::from(self.new_length()) - i128::from(self.old_length())
    }
}

/// Outcome of a completed transform.
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    /// File family name.
    pub family: &'static str,
    /// Tick duration the input was written with.
    pub old_duration: TickDuration,
    /// Tick duration the output is for.
    pub new_duration: TickDuration,
    /// Epoch capacity at the old duration.
    pub old_capacity: Capacity,
    /// Epoch capacity at the new duration.
    pub new_capacity: Capacity,
    /// Where the input was read from.
    pub input_location: String,
    /// Where the output was written.
    pub output_location: String,
    /// Where the original bytes were copied, if a backup was taken.
    pub backup_location: Option<String>,
    /// Input length in bytes.
    pub old_length: u64,
    /// Output length in bytes.
    pub new_length: u64,
    /// Per-array changes, in file order.
    pub changes: Vec<RegionChange>,
    /// Stages passed.
    pub stages: Vec<TransformStage>,
    /// What verification checked.
    pub verification: VerificationSummary,
    /// True if truncation dropped non-zero bytes.
    pub data_loss: bool,
}

impl TransformReport {
    /// `new_length - old_length`.
    #[must_use]
    pub fn size_delta(&self) -> i128 {
        i128::from(self.new_length) - i128::from(self.old_length)
    }

    /// Total non-zero bytes dropped by truncation.
    #[must_use]
    pub fn non_zero_bytes_discarded(&self) -> u64 {
        self.changes.iter().map(|c| c.non_zero_bytes_discarded).sum()
    }

    /// Returns true if `stage` was passed.
    #[must_use]
    pub fn passed(&self, stage: TransformStage) -> bool {
        self.stages.contains(&stage)
    }
}
