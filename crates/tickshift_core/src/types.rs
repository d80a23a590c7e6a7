//! Core type definitions for tickshift.

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::fmt;

/// Wall-clock duration of one tick, in milliseconds.
///
/// This is the node's `TARGET_TICK_DURATION`. It is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TickDuration(u64);

impl TickDuration {
    /// Creates a tick duration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDuration`] if `ms` is zero.
    pub fn from_millis(ms: u64) -> CoreResult<Self> {
        if ms == 0 {
            return Err(CoreError::invalid_duration(ms, "tick duration must be positive"));
        }
        Ok(Self(ms))
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the duration in whole seconds, rounded down.
    #[must_use]
    pub const fn whole_seconds(self) -> u64 {
        self.0 / 1000
    }
}

impl fmt::Display for TickDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.0)
    }
}

/// Maximum number of ticks an epoch can hold.
///
/// This is the node's `MAX_NUMBER_OF_TICKS_PER_EPOCH`.
pub type Capacity = u64;
