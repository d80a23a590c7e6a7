//! # tickshift Core
//!
//! Resizes the tick-indexed state files of a ledger node when its target
//! tick duration changes.
//!
//! The node sizes several persistent arrays by the maximum number of ticks
//! in an epoch, which depends on the tick duration. A snapshot written
//! under one duration cannot be loaded under another until its per-tick
//! arrays are grown or shrunk. This crate provides:
//!
//! - **Capacity**: duration to ticks-per-epoch ([`CapacityFormula`])
//! - **Layouts**: declarative region lists per file family ([`FileFamily`])
//! - **Resizing**: one algorithm over any pair of compatible layouts ([`resize`])
//! - **Transforms**: load, resize, back up, write, verify ([`Transformer`])
//!
//! ## Example
//!
//! ```rust
//! use tickshift_core::{
//!     CapacityFormula, FileFamily, ProtocolFormula, TickDuration, TxStatusFamily,
//! };
//!
//! let capacity = ProtocolFormula::default()
//!     .capacity_for(TickDuration::from_millis(3000).unwrap())
//!     .unwrap();
//! assert_eq!(capacity, 202_124);
//! assert_eq!(TxStatusFamily.expected_length(capacity).unwrap(), 1_617_800);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capacity;
mod config;
mod error;
pub mod layout;
mod resize;
pub mod transform;
mod types;

pub use capacity::{
    capacity_for_duration, CapacityBreakdown, CapacityFormula, CapacityTable, ProtocolFormula,
    NUMBER_OF_COMPUTORS, SECONDS_PER_EPOCH,
};
pub use config::{TransformConfig, DEFAULT_BACKUP_SUFFIX};
pub use error::{CoreError, CoreResult};
pub use layout::{
    FileFamily, LayoutDescriptor, LogStateFamily, LogStateGeometry, LogStateVariables, Region,
    RegionKind, RegionSpec, SizeRule, TxStatusFamily, TxStatusSummary,
    TICKS_TO_KEEP_FROM_PRIOR_EPOCH,
};
pub use resize::{resize, RegionChange, ResizeOutcome};
pub use transform::{
    transform_file, TransformPlan, TransformReport, TransformStage, Transformer,
    VerificationSummary,
};
pub use types::{Capacity, TickDuration};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
