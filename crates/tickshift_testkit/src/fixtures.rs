//! Synthetic state files and on-disk helpers.
//!
//! Real logging state files are close to a gigabyte, dominated by three
//! fixed pages. The fixtures here shrink those pages with
//! [`small_log_state`] so scenario tests keep the node's real capacities
//! while writing only a few megabytes.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tickshift_core::layout::log_state::{regions as log_regions, DIGEST_SIZE};
use tickshift_core::layout::tx_status::regions as tx_regions;
use tickshift_core::{
    Capacity, FileFamily, LayoutDescriptor, LogStateFamily, LogStateGeometry, LogStateVariables,
    TxStatusFamily, DEFAULT_BACKUP_SUFFIX,
};

/// Log-state geometry with tiny fixed pages.
pub fn small_log_state_geometry() -> LogStateGeometry {
    LogStateGeometry::new()
        .log_buffer_page_size(1024)
        .pmap_page_entries(8)
        .imap_page_entries(1)
}

/// Log-state family using [`small_log_state_geometry`].
pub fn small_log_state() -> LogStateFamily {
    LogStateFamily::new(small_log_state_geometry())
}

/// Deterministic non-zero filler bytes.
pub fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) | 1)
        .collect()
}

/// Variables block written by [`log_state_file`].
pub fn sample_variables(populated_ticks: u64) -> LogStateVariables {
    LogStateVariables {
        log_buffer_tail: 512,
        log_id: 9_001,
        tick_begin: 16_000_000,
        last_updated_tick: 16_000_000 + populated_ticks as u32,
        current_tx_id: 4,
        current_tick: 16_000_001 + populated_ticks as u32,
    }
}

/// Builds a log-state file at `capacity`.
///
/// Fixed pages are filled with a pattern, the first `populated_ticks`
/// digest slots hold non-zero digests and the rest are zero.
pub fn log_state_file(
    family: &LogStateFamily,
    capacity: Capacity,
    populated_ticks: u64,
) -> Vec<u8> {
    let layout = family
        .instantiate(capacity)
        .expect("log-state layout should fit");
    let mut data = vec![0u8; layout.total_length() as usize];

    for (seed, name) in [
        log_regions::LOG_BUFFER,
        log_regions::MAP_LOG_ID,
        log_regions::MAP_TX,
        log_regions::K12_STATE,
    ]
    .into_iter()
    .enumerate()
    {
        let range = region_range(&layout, name);
        let len = range.len();
        data[range].copy_from_slice(&patterned(len, seed as u8));
    }

    let digests = region_range(&layout, log_regions::DIGESTS);
    let filled = (populated_ticks.min(capacity) * DIGEST_SIZE) as usize;
    data[digests.start..digests.start + filled].copy_from_slice(&patterned(filled, 0x5A));

    let variables = region_range(&layout, log_regions::VARIABLES);
    data[variables].copy_from_slice(&sample_variables(populated_ticks).encode());

    data
}

/// Builds a tx-status snapshot at `capacity` whose counters are non-zero
/// exactly in `used_slots`.
///
/// Index starts are the running sum of counters, so the first used slot has
/// index start zero.
pub fn tx_status_file(capacity: Capacity, used_slots: Range<u64>) -> Vec<u8> {
    let layout = TxStatusFamily
        .instantiate(capacity)
        .expect("tx-status layout should fit");
    let mut data = vec![0u8; layout.total_length() as usize];

    let counters = region_range(&layout, tx_regions::TICK_TX_COUNTER).start;
    let index_starts = region_range(&layout, tx_regions::TICK_TX_INDEX_START).start;
    let slots = capacity + tickshift_core::TICKS_TO_KEEP_FROM_PRIOR_EPOCH;

    let mut running = 0u32;
    for slot in used_slots.start..used_slots.end.min(slots) {
        let at = slot as usize * 4;
        let count = (slot % 7) as u32 + 1;
        data[counters + at..counters + at + 4].copy_from_slice(&count.to_le_bytes());
        data[index_starts + at..index_starts + at + 4].copy_from_slice(&running.to_le_bytes());
        running += count;
    }

    write_u32(&mut data, &layout, tx_regions::PREVIOUS_EPOCH_BEGIN_TICK, 15_500_000);
    write_u32(&mut data, &layout, tx_regions::CURRENT_EPOCH_BEGIN_TICK, 16_000_000);
    data
}

/// Byte range of a region that must exist.
pub fn region_range(layout: &LayoutDescriptor, name: &str) -> Range<usize> {
    layout
        .region(name)
        .unwrap_or_else(|| panic!("{} layout has no region {name}", layout.family()))
        .range()
}

fn write_u32(data: &mut [u8], layout: &LayoutDescriptor, name: &str, value: u32) {
    let range = region_range(layout, name);
    data[range].copy_from_slice(&value.to_le_bytes());
}

/// A state file in its own temporary directory.
pub struct TempStateFile {
    path: PathBuf,
    _dir: TempDir,
}

impl TempStateFile {
    /// Writes `contents` to `name` in a fresh temporary directory.
    pub fn new(name: &str, contents: &[u8]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write state file");
        Self { path, _dir: dir }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the default backup next to the state file.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(DEFAULT_BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// A sibling path in the same directory.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self._dir.path().join(name)
    }

    /// Current contents of the state file.
    pub fn read(&self) -> Vec<u8> {
        fs::read(&self.path).expect("Failed to read state file")
    }

    /// Current contents of the backup file, if any.
    pub fn read_backup(&self) -> Option<Vec<u8>> {
        fs::read(self.backup_path()).ok()
    }
}
