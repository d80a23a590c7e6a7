//! Tick duration to epoch capacity.
//!
//! The node sizes its tick-indexed arrays with `MAX_NUMBER_OF_TICKS_PER_EPOCH`,
//! which is derived from `TARGET_TICK_DURATION`. The derivation is a protocol
//! constant owned by the node, so it is modelled as a [`CapacityFormula`] that
//! callers inject: [`ProtocolFormula`] reproduces the node's macro, and
//! [`CapacityTable`] pins explicit values.
//!
//! ```rust
//! use tickshift_core::{CapacityFormula, ProtocolFormula, TickDuration};
//!
//! let formula = ProtocolFormula::default();
//! let ticks = formula.capacity_for(TickDuration::from_millis(3000).unwrap()).unwrap();
//! assert_eq!(ticks, 202_124);
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Capacity, TickDuration};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Seconds in one epoch (one week).
pub const SECONDS_PER_EPOCH: u64 = 60 * 60 * 24 * 7;

/// Number of computors; the capacity is rounded up to a multiple of this.
pub const NUMBER_OF_COMPUTORS: u64 = 676;

/// Maps a tick duration to the maximum number of ticks per epoch.
///
/// Implementations must be pure: the same duration always yields the same
/// capacity, and the capacity never increases as the duration grows.
pub trait CapacityFormula: Send + Sync {
    /// Returns the capacity for `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDuration`] if no positive capacity exists
    /// for this duration.
    fn capacity_for(&self, duration: TickDuration) -> CoreResult<Capacity>;

    /// Short description used in reports.
    fn describe(&self) -> String;
}

/// Step-by-step evaluation of [`ProtocolFormula`], for `--show-calculation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityBreakdown {
    /// Input duration.
    pub duration: TickDuration,
    /// `duration / 1000`, integer division.
    pub tick_seconds: u64,
    /// Seconds per epoch.
    pub seconds_per_epoch: u64,
    /// `seconds_per_epoch / tick_seconds`, before rounding.
    pub raw_ticks: u64,
    /// Rounding granularity.
    pub number_of_computors: u64,
    /// Final capacity.
    pub capacity: Capacity,
}

impl fmt::Display for CapacityBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TARGET_TICK_DURATION = {}", self.duration)?;
        writeln!(
            f,
            "  tick seconds      = {} / 1000 = {}",
            self.duration.as_millis(),
            self.tick_seconds
        )?;
        writeln!(
            f,
            "  ticks per epoch   = {} / {} = {}",
            self.seconds_per_epoch, self.tick_seconds, self.raw_ticks
        )?;
        write!(
            f,
            "  rounded up to {} = {}",
            self.number_of_computors, self.capacity
        )
    }
}

/// The node's own `MAX_NUMBER_OF_TICKS_PER_EPOCH` formula:
///
/// ```text
/// ((SECONDS_PER_EPOCH / (TARGET_TICK_DURATION / 1000)) + N - 1) / N * N
/// ```
///
/// evaluated with integer division throughout, `N` being the computor count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolFormula {
    seconds_per_epoch: u64,
    number_of_computors: u64,
}

impl Default for ProtocolFormula {
    fn default() -> Self {
        Self {
            seconds_per_epoch: SECONDS_PER_EPOCH,
            number_of_computors: NUMBER_OF_COMPUTORS,
        }
    }
}

impl ProtocolFormula {
    /// Creates the formula with the node's constants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the epoch length in seconds.
    #[must_use]
    pub const fn seconds_per_epoch(mut self, seconds: u64) -> Self {
        self.seconds_per_epoch = seconds;
        self
    }

    /// Sets the computor count used for rounding.
    #[must_use]
    pub const fn number_of_computors(mut self, count: u64) -> Self {
        self.number_of_computors = count;
        self
    }

    /// Evaluates the formula and returns every intermediate value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDuration`] if the duration is below one
    /// second (the node's integer division would divide by zero) or the
    /// result is zero.
    pub fn breakdown(&self, duration: TickDuration) -> CoreResult<CapacityBreakdown> {
        let ms = duration.as_millis();
        let tick_seconds = duration.whole_seconds();
        if tick_seconds == 0 {
            return Err(CoreError::invalid_duration(
                ms,
                "below 1000 ms the protocol formula divides by zero",
            ));
        }
        if self.number_of_computors == 0 {
            return Err(CoreError::invalid_duration(ms, "computor count is zero"));
        }

        let raw_ticks = self.seconds_per_epoch / tick_seconds;
        let n = self.number_of_computors;
        let capacity = raw_ticks
            .checked_add(n - 1)
            .map(|v| v / n * n)
            .ok_or_else(|| CoreError::invalid_duration(ms, "capacity overflows u64"))?;

        if capacity == 0 {
            return Err(CoreError::invalid_duration(
                ms,
                format!("longer than one epoch ({} s)", self.seconds_per_epoch),
            ));
        }

        Ok(CapacityBreakdown {
            duration,
            tick_seconds,
            seconds_per_epoch: self.seconds_per_epoch,
            raw_ticks,
            number_of_computors: n,
            capacity,
        })
    }
}

impl CapacityFormula for ProtocolFormula {
    fn capacity_for(&self, duration: TickDuration) -> CoreResult<Capacity> {
        Ok(self.breakdown(duration)?.capacity)
    }

    fn describe(&self) -> String {
        format!(
            "protocol formula ({} s per epoch, {} computors)",
            self.seconds_per_epoch, self.number_of_computors
        )
    }
}

/// An explicit duration to capacity table.
///
/// Useful when the protocol constants are revised, and for tests that want
/// small synthetic capacities.
#[derive(Debug, Clone, Default)]
pub struct CapacityTable {
    entries: BTreeMap<u64, Capacity>,
}

impl CapacityTable {
    /// Builds a table from `(duration_ms, capacity)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDuration`] if a duration or capacity is
    /// zero, or if a longer duration maps to a larger capacity.
    pub fn new(entries: impl IntoIterator<Item = (u64, Capacity)>) -> CoreResult<Self> {
        let mut table = BTreeMap::new();
        for (ms, capacity) in entries {
            TickDuration::from_millis(ms)?;
            if capacity == 0 {
                return Err(CoreError::invalid_duration(ms, "table capacity is zero"));
            }
            table.insert(ms, capacity);
        }

        let mut previous: Option<(u64, Capacity)> = None;
        for (&ms, &capacity) in &table {
            if let Some((prev_ms, prev_capacity)) = previous {
                if capacity > prev_capacity {
                    return Err(CoreError::invalid_duration(
                        ms,
                        format!(
                            "table capacity {capacity} exceeds {prev_capacity} at shorter {prev_ms} ms"
                        ),
                    ));
                }
            }
            previous = Some((ms, capacity));
        }

        Ok(Self { entries: table })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CapacityFormula for CapacityTable {
    fn capacity_for(&self, duration: TickDuration) -> CoreResult<Capacity> {
        self.entries
            .get(&duration.as_millis())
            .copied()
            .ok_or_else(|| {
                CoreError::invalid_duration(duration.as_millis(), "no capacity table entry")
            })
    }

    fn describe(&self) -> String {
        format!("capacity table ({} entries)", self.entries.len())
    }
}

/// Capacity for `duration_ms` under the node's protocol formula.
///
/// # Errors
///
/// Returns [`CoreError::InvalidDuration`] for zero or sub-second durations.
pub fn capacity_for_duration(duration_ms: u64) -> CoreResult<Capacity> {
    ProtocolFormula::default().capacity_for(TickDuration::from_millis(duration_ms)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> TickDuration {
        TickDuration::from_millis(v).unwrap()
    }

    #[test]
    fn known_capacities() {
        assert_eq!(capacity_for_duration(1000).unwrap(), 605_020);
        assert_eq!(capacity_for_duration(2000).unwrap(), 302_848);
        assert_eq!(capacity_for_duration(3000).unwrap(), 202_124);
        assert_eq!(capacity_for_duration(4000).unwrap(), 151_424);
        assert_eq!(capacity_for_duration(5000).unwrap(), 121_004);
    }

    #[test]
    fn capacity_is_multiple_of_computors() {
        for duration in [1000, 1500, 2000, 3000, 7000, 60_000] {
            let capacity = capacity_for_duration(duration).unwrap();
            assert_eq!(capacity % NUMBER_OF_COMPUTORS, 0, "{duration} ms");
        }
    }

    #[test]
    fn sub_second_durations_truncate_like_the_node() {
        assert_eq!(
            capacity_for_duration(2500).unwrap(),
            capacity_for_duration(2000).unwrap()
        );
        assert!(matches!(
            capacity_for_duration(999),
            Err(CoreError::InvalidDuration { duration_ms: 999, .. })
        ));
    }

    #[test]
    fn zero_duration_rejected() {
        assert!(matches!(
            capacity_for_duration(0),
            Err(CoreError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn duration_longer_than_epoch_rejected() {
        let formula = ProtocolFormula::new().seconds_per_epoch(10);
        assert!(formula.capacity_for(ms(11_000)).is_err());
        assert_eq!(formula.capacity_for(ms(10_000)).unwrap(), 676);
    }

    #[test]
    fn breakdown_values() {
        let breakdown = ProtocolFormula::default().breakdown(ms(3000)).unwrap();
        assert_eq!(breakdown.tick_seconds, 3);
        assert_eq!(breakdown.raw_ticks, 201_600);
        assert_eq!(breakdown.capacity, 202_124);
        assert!(breakdown.to_string().contains("202124"));
    }

    #[test]
    fn custom_constants() {
        let formula = ProtocolFormula::new()
            .seconds_per_epoch(1000)
            .number_of_computors(10);
        assert_eq!(formula.capacity_for(ms(3000)).unwrap(), 340);
    }

    #[test]
    fn table_lookup() {
        let table = CapacityTable::new([(2000, 150), (3000, 100)]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.capacity_for(ms(2000)).unwrap(), 150);
        assert!(matches!(
            table.capacity_for(ms(2500)),
            Err(CoreError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn table_must_be_non_increasing() {
        assert!(CapacityTable::new([(2000, 100), (3000, 150)]).is_err());
        assert!(CapacityTable::new([(2000, 0)]).is_err());
        assert!(CapacityTable::new([(0, 10)]).is_err());
    }

    proptest! {
        #[test]
        fn capacity_never_increases_with_duration(
            a in 1000u64..700_000_000,
            b in 1000u64..700_000_000,
        ) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            let formula = ProtocolFormula::default();
            match (formula.capacity_for(ms(short)), formula.capacity_for(ms(long))) {
                (Ok(c_short), Ok(c_long)) => prop_assert!(c_short >= c_long),
                (Ok(_), Err(_)) | (Err(_), Err(_)) => {}
                (Err(_), Ok(_)) => prop_assert!(false, "shorter duration failed but longer succeeded"),
            }
        }

        #[test]
        fn capacity_is_deterministic(d in 1000u64..10_000_000) {
            let formula = ProtocolFormula::default();
            prop_assert_eq!(
                formula.capacity_for(ms(d)).ok(),
                formula.capacity_for(ms(d)).ok()
            );
        }
    }
}
