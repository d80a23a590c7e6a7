//! Layout of the transaction status snapshot (`snapshotTxStatusData`).
//!
//! ```text
//! | tickTxCounter[capacity + 100] | tickTxIndexStart[capacity + 100] | prevEpochBegin (4) | currEpochBegin (4) |
//! ```
//!
//! Both arrays hold little-endian `u32`s and keep the last
//! [`TICKS_TO_KEEP_FROM_PRIOR_EPOCH`] ticks of the previous epoch.

use super::{FileFamily, LayoutDescriptor, RegionSpec};
use crate::error::{CoreError, CoreResult};
use serde::Serialize;

/// Slots kept for ticks of the previous epoch.
pub const TICKS_TO_KEEP_FROM_PRIOR_EPOCH: u64 = 100;

/// Size of one array element.
pub const ELEMENT_SIZE: u64 = 4;

/// Region names, in file order.
pub mod regions {
    /// Number of transactions per tick.
    pub const TICK_TX_COUNTER: &str = "tick_tx_counter";
    /// Index of each tick's first transaction.
    pub const TICK_TX_INDEX_START: &str = "tick_tx_index_start";
    /// `confirmedTxPreviousEpochBeginTick`.
    pub const PREVIOUS_EPOCH_BEGIN_TICK: &str = "confirmed_tx_previous_epoch_begin_tick";
    /// `confirmedTxCurrentEpochBeginTick`.
    pub const CURRENT_EPOCH_BEGIN_TICK: &str = "confirmed_tx_current_epoch_begin_tick";
}

/// The transaction status snapshot family.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxStatusFamily;

impl TxStatusFamily {
    /// Family name.
    pub const NAME: &'static str = "tx-status";
}

impl FileFamily for TxStatusFamily {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn region_specs(&self) -> Vec<RegionSpec> {
        vec![
            RegionSpec::per_tick(
                regions::TICK_TX_COUNTER,
                ELEMENT_SIZE,
                TICKS_TO_KEEP_FROM_PRIOR_EPOCH,
            ),
            RegionSpec::per_tick(
                regions::TICK_TX_INDEX_START,
                ELEMENT_SIZE,
                TICKS_TO_KEEP_FROM_PRIOR_EPOCH,
            ),
            RegionSpec::fixed(regions::PREVIOUS_EPOCH_BEGIN_TICK, 4),
            RegionSpec::fixed(regions::CURRENT_EPOCH_BEGIN_TICK, 4),
        ]
    }
}

/// Usage statistics of a transaction status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxStatusSummary {
    /// Slots per array.
    pub slots: u64,
    /// Non-zero entries in `tick_tx_counter`.
    pub non_zero_counters: u64,
    /// Non-zero entries in `tick_tx_index_start`.
    pub non_zero_index_starts: u64,
    /// Highest slot with a non-zero counter.
    pub highest_used_slot: Option<u64>,
    /// `confirmedTxPreviousEpochBeginTick`.
    pub previous_epoch_begin_tick: u32,
    /// `confirmedTxCurrentEpochBeginTick`.
    pub current_epoch_begin_tick: u32,
}

impl TxStatusSummary {
    /// Scans a snapshot buffer laid out as `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutMismatch`] if `layout` is not a tx-status
    /// layout, or [`CoreError::CorruptInput`] if the buffer length differs.
    pub fn scan(buffer: &[u8], layout: &LayoutDescriptor) -> CoreResult<Self> {
        if layout.family() != TxStatusFamily::NAME {
            return Err(CoreError::layout_mismatch(
                "buffer",
                format!(
                    "expected {} layout, got {}",
                    TxStatusFamily::NAME,
                    layout.family()
                ),
            ));
        }
        layout.check_length("buffer", buffer.len() as u64)?;

        let region = |name: &str| {
            layout
                .region(name)
                .map(|r| &buffer[r.range()])
                .ok_or_else(|| {
                    CoreError::layout_mismatch("buffer", format!("missing region {name}"))
                })
        };
        let counters = region(regions::TICK_TX_COUNTER)?;
        let index_starts = region(regions::TICK_TX_INDEX_START)?;

        let words = |bytes: &[u8]| {
            bytes
                .chunks_exact(ELEMENT_SIZE as usize)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect::<Vec<_>>()
        };
        let counters = words(counters);
        let index_starts = words(index_starts);
        let scalar = |name: &str| -> CoreResult<u32> {
            let bytes = region(name)?;
            Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        };

        Ok(Self {
            slots: counters.len() as u64,
            non_zero_counters: counters.iter().filter(|&&v| v != 0).count() as u64,
            non_zero_index_starts: index_starts.iter().filter(|&&v| v != 0).count() as u64,
            highest_used_slot: counters.iter().rposition(|&v| v != 0).map(|i| i as u64),
            previous_epoch_begin_tick: scalar(regions::PREVIOUS_EPOCH_BEGIN_TICK)?,
            current_epoch_begin_tick: scalar(regions::CURRENT_EPOCH_BEGIN_TICK)?,
        })
    }
}
