//! Layout of the logging state file (`logEventState.db`).
//!
//! ```text
//! | log buffer VM | map log id VM | map tx VM | digests[capacity] | K12 state | variables |
//! ```
//!
//! Each VM block is its page followed by two 8-byte bookkeeping words. The
//! digests are 32 bytes per tick. The variables block is 32 bytes:
//!
//! ```text
//! | log_buffer_tail (8) | log_id (8) | tick_begin (4) | last_updated_tick (4) | current_tx_id (4) | current_tick (4) |
//! ```

use super::{FileFamily, RegionSpec};
use crate::error::{CoreError, CoreResult};
use serde::Serialize;

/// Bytes in one log digest.
pub const DIGEST_SIZE: u64 = 32;

/// Size of the variables block.
pub const VARIABLES_SIZE: u64 = 8 + 8 + 4 + 4 + 4 + 4;

/// Region names, in file order.
pub mod regions {
    /// Log buffer page with its VM header.
    pub const LOG_BUFFER: &str = "log_buffer";
    /// PMAP page (log id to blob info) with its VM header.
    pub const MAP_LOG_ID: &str = "map_log_id";
    /// IMAP page (tick to blob info) with its VM header.
    pub const MAP_TX: &str = "map_tx";
    /// Per-tick digests.
    pub const DIGESTS: &str = "digests";
    /// KangarooTwelve hashing state.
    pub const K12_STATE: &str = "k12_state";
    /// Scalar variables.
    pub const VARIABLES: &str = "variables";
}

/// Fixed page sizes of the logging state file.
///
/// Defaults are the node's compiled-in sizes. Setters exist for nodes built
/// with different constants and for tests that need small files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStateGeometry {
    /// `LOG_BUFFER_PAGE_SIZE` in bytes.
    pub log_buffer_page_size: u64,
    /// `PMAP_LOG_PAGE_SIZE` in entries.
    pub pmap_page_entries: u64,
    /// `sizeof(BlobInfo)`.
    pub pmap_entry_size: u64,
    /// `IMAP_LOG_PAGE_SIZE` in entries.
    pub imap_page_entries: u64,
    /// `sizeof(TickBlobInfo)`.
    pub imap_entry_size: u64,
    /// Bookkeeping bytes following each VM page.
    pub vm_header_size: u64,
    /// `sizeof(KangarooTwelve_Instance)`.
    pub k12_state_size: u64,
}

impl Default for LogStateGeometry {
    fn default() -> Self {
        Self {
            log_buffer_page_size: 300_000_000,
            pmap_page_entries: 30_000_000,
            pmap_entry_size: 16,
            imap_page_entries: 10_000,
            imap_entry_size: 16_464,
            vm_header_size: 8 + 8,
            k12_state_size: 448,
        }
    }
}

impl LogStateGeometry {
    /// Creates the node's default geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log buffer page size in bytes.
    #[must_use]
    pub const fn log_buffer_page_size(mut self, bytes: u64) -> Self {
        self.log_buffer_page_size = bytes;
        self
    }

    /// Sets the PMAP page size in entries.
    #[must_use]
    pub const fn pmap_page_entries(mut self, entries: u64) -> Self {
        self.pmap_page_entries = entries;
        self
    }

    /// Sets the IMAP page size in entries.
    #[must_use]
    pub const fn imap_page_entries(mut self, entries: u64) -> Self {
        self.imap_page_entries = entries;
        self
    }

    /// Sets the K12 state size in bytes.
    #[must_use]
    pub const fn k12_state_size(mut self, bytes: u64) -> Self {
        self.k12_state_size = bytes;
        self
    }

    fn vm_block(&self, page_bytes: Option<u64>) -> Option<u64> {
        page_bytes?.checked_add(self.vm_header_size)
    }
}

/// The logging state file family.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStateFamily {
    geometry: LogStateGeometry,
}

impl LogStateFamily {
    /// Family name.
    pub const NAME: &'static str = "log-state";

    /// Creates the family with the given geometry.
    #[must_use]
    pub const fn new(geometry: LogStateGeometry) -> Self {
        Self { geometry }
    }

    /// Returns the geometry.
    #[must_use]
    pub const fn geometry(&self) -> &LogStateGeometry {
        &self.geometry
    }
}

impl FileFamily for LogStateFamily {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn region_specs(&self) -> Vec<RegionSpec> {
        let g = &self.geometry;
        // Overflowing page products saturate; instantiation then reports the
        // total as exceeding the addressable size.
        let saturate = |v: Option<u64>| v.unwrap_or(u64::MAX);
        vec![
            RegionSpec::fixed(
                regions::LOG_BUFFER,
                saturate(g.vm_block(Some(g.log_buffer_page_size))),
            ),
            RegionSpec::fixed(
                regions::MAP_LOG_ID,
                saturate(g.vm_block(g.pmap_page_entries.checked_mul(g.pmap_entry_size))),
            ),
            RegionSpec::fixed(
                regions::MAP_TX,
                saturate(g.vm_block(g.imap_page_entries.checked_mul(g.imap_entry_size))),
            ),
            RegionSpec::per_tick(regions::DIGESTS, DIGEST_SIZE, 0),
            RegionSpec::fixed(regions::K12_STATE, g.k12_state_size),
            RegionSpec::fixed(regions::VARIABLES, VARIABLES_SIZE),
        ]
    }
}

/// Decoded variables block of a logging state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LogStateVariables {
    /// Write position in the log buffer.
    pub log_buffer_tail: u64,
    /// Monotonic log identifier.
    pub log_id: u64,
    /// First tick of the epoch.
    pub tick_begin: u32,
    /// Last tick whose digest was updated.
    pub last_updated_tick: u32,
    /// Transaction index within the current tick.
    pub current_tx_id: u32,
    /// Current tick.
    pub current_tick: u32,
}

impl LogStateVariables {
    /// Decodes the 32-byte little-endian variables block.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptInput`] if `data` is not 32 bytes.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() as u64 != VARIABLES_SIZE {
            return Err(CoreError::corrupt_input(
                regions::VARIABLES,
                LogStateFamily::NAME,
                0,
                VARIABLES_SIZE,
                data.len() as u64,
            ));
        }
        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[at..at + 8]);
            u64::from_le_bytes(bytes)
        };
        let u32_at = |at: usize| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&data[at..at + 4]);
            u32::from_le_bytes(bytes)
        };
        Ok(Self {
            log_buffer_tail: u64_at(0),
            log_id: u64_at(8),
            tick_begin: u32_at(16),
            last_updated_tick: u32_at(20),
            current_tx_id: u32_at(24),
            current_tick: u32_at(28),
        })
    }

    /// Encodes the variables block.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(VARIABLES_SIZE as usize);
        buf.extend_from_slice(&self.log_buffer_tail.to_le_bytes());
        buf.extend_from_slice(&self.log_id.to_le_bytes());
        buf.extend_from_slice(&self.tick_begin.to_le_bytes());
        buf.extend_from_slice(&self.last_updated_tick.to_le_bytes());
        buf.extend_from_slice(&self.current_tx_id.to_le_bytes());
        buf.extend_from_slice(&self.current_tick.to_le_bytes());
        buf
    }
}
