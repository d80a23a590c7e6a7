//! Region resizer.
//!
//! One algorithm for every file family: walk the old and new layouts region
//! by region, copy fixed regions verbatim, and grow or shrink array regions.
//! Growth appends zero elements. Shrinking keeps the leading elements and
//! counts the non-zero bytes it drops, so callers can warn about data loss.

use crate::error::{CoreError, CoreResult};
use crate::layout::{LayoutDescriptor, Region, RegionKind};
use serde::Serialize;
use tracing::{debug, warn};

/// What happened to one array region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionChange {
    /// Region name.
    pub name: &'static str,
    /// Element size in bytes.
    pub element_size: u64,
    /// Offset in the input.
    pub old_offset: u64,
    /// Offset in the output.
    pub new_offset: u64,
    /// Length in the input.
    pub old_length: u64,
    /// Length in the output.
    pub new_length: u64,
    /// Zero bytes appended.
    pub bytes_zero_filled: u64,
    /// Bytes dropped from the end.
    pub bytes_truncated: u64,
    /// Non-zero bytes among the dropped ones.
    pub non_zero_bytes_discarded: u64,
}

impl RegionChange {
    /// Returns true if dropped bytes held data.
    #[must_use]
    pub const fn is_lossy(&self) -> bool {
        self.non_zero_bytes_discarded > 0
    }

    /// Bytes carried over from the input.
    #[must_use]
    pub const fn retained_length(&self) -> u64 {
        if self.new_length < self.old_length {
            self.new_length
        } else {
            self.old_length
        }
    }
}

/// Result of [`resize`].
#[derive(Debug, Clone)]
pub struct ResizeOutcome {
    /// The resized file content.
    pub buffer: Vec<u8>,
    /// One entry per array region, in file order.
    pub changes: Vec<RegionChange>,
}

impl ResizeOutcome {
    /// Returns true if any truncated region dropped non-zero bytes.
    #[must_use]
    pub fn has_data_loss(&self) -> bool {
        self.changes.iter().any(RegionChange::is_lossy)
    }

    /// Total non-zero bytes dropped across regions.
    #[must_use]
    pub fn non_zero_bytes_discarded(&self) -> u64 {
        self.changes.iter().map(|c| c.non_zero_bytes_discarded).sum()
    }

    /// Looks up the change for a region.
    #[must_use]
    pub fn change(&self, name: &str) -> Option<&RegionChange> {
        self.changes.iter().find(|c| c.name == name)
    }
}

/// Resizes `old_buffer` from `old_layout` to `new_layout`.
///
/// # Errors
///
/// - [`CoreError::CorruptInput`] if the buffer length differs from `old_layout`
/// - [`CoreError::LayoutMismatch`] if the layouts are of different families
/// - [`CoreError::MisalignedTruncation`] if a shrunk array would end inside an element
/// - [`CoreError::InsufficientResources`] if the output cannot be allocated
pub fn resize(
    old_buffer: &[u8],
    old_layout: &LayoutDescriptor,
    new_layout: &LayoutDescriptor,
) -> CoreResult<ResizeOutcome> {
    old_layout.check_compatible(new_layout)?;
    old_layout.check_length("buffer", old_buffer.len() as u64)?;

    let new_total = new_layout.total_length();
    let mut buffer: Vec<u8> = Vec::new();
    buffer
        .try_reserve_exact(new_total as usize)
        .map_err(|_| CoreError::InsufficientResources {
            resource: "memory",
            location: "resize buffer".into(),
            needed: new_total,
            available: 0,
        })?;

    let mut changes = Vec::new();

    for (old, new) in old_layout.regions().iter().zip(new_layout.regions()) {
        debug_assert_eq!(buffer.len() as u64, new.offset);
        let source = &old_buffer[old.range()];

        match new.kind {
            RegionKind::Fixed => {
                buffer.extend_from_slice(source);
                debug!(region = old.name, bytes = old.length, "copied fixed region");
            }
            RegionKind::VariableArray { element_size } => {
                let change = resize_array(&mut buffer, source, old, new, element_size)?;
                if change.is_lossy() {
                    warn!(
                        region = change.name,
                        non_zero_bytes = change.non_zero_bytes_discarded,
                        truncated = change.bytes_truncated,
                        "truncation discards non-zero data"
                    );
                }
                changes.push(change);
            }
        }
    }

    if buffer.len() as u64 != new_total {
        return Err(CoreError::verification_failed(
            "resize buffer",
            format!("built {} bytes, layout expects {new_total}", buffer.len()),
        ));
    }

    Ok(ResizeOutcome { buffer, changes })
}

fn resize_array(
    buffer: &mut Vec<u8>,
    source: &[u8],
    old: &Region,
    new: &Region,
    element_size: u64,
) -> CoreResult<RegionChange> {
    let mut change = RegionChange {
        name: new.name,
        element_size,
        old_offset: old.offset,
        new_offset: new.offset,
        old_length: old.length,
        new_length: new.length,
        bytes_zero_filled: 0,
        bytes_truncated: 0,
        non_zero_bytes_discarded: 0,
    };

    if new.length >= old.length {
        change.bytes_zero_filled = new.length - old.length;
        buffer.extend_from_slice(source);
        buffer.resize(buffer.len() + change.bytes_zero_filled as usize, 0);
        debug!(
            region = new.name,
            from = old.length,
            to = new.length,
            "grew array region"
        );
    } else {
        if new.length.checked_rem(element_size) != Some(0) {
            return Err(CoreError::MisalignedTruncation {
                location: "buffer".into(),
                region: new.name,
                new_length: new.length,
                element_size,
            });
        }
        let keep = new.length as usize;
        let (kept, dropped) = source.split_at(keep);
        change.bytes_truncated = dropped.len() as u64;
        change.non_zero_bytes_discarded = dropped.iter().filter(|&&b| b != 0).count() as u64;
        buffer.extend_from_slice(kept);
        debug!(
            region = new.name,
            from = old.length,
            to = new.length,
            non_zero_discarded = change.non_zero_bytes_discarded,
            "shrank array region"
        );
    }

    Ok(change)
}
