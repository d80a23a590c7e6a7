//! Declarative binary layouts of tick-indexed state files.
//!
//! A file family is described as an ordered list of [`RegionSpec`]s. Each
//! spec is either a fixed number of bytes or a per-tick array whose length
//! follows the epoch capacity. Instantiating the list at a capacity yields a
//! [`LayoutDescriptor`] with absolute offsets:
//!
//! ```text
//! | fixed | fixed | array(capacity * 32) | fixed | ...
//! 0       a       b                      c       total_length
//! ```
//!
//! Regions are contiguous, non-overlapping, and cover the file exactly:
//! there is no padding and no trailing slack.

pub mod log_state;
pub mod tx_status;

pub use log_state::{LogStateFamily, LogStateGeometry, LogStateVariables};
pub use tx_status::{TxStatusFamily, TxStatusSummary, TICKS_TO_KEEP_FROM_PRIOR_EPOCH};

use crate::error::{CoreError, CoreResult};
use crate::types::Capacity;
use serde::Serialize;
use std::ops::Range;

/// How a region's length is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionKind {
    /// Same length for every capacity; content is carried over verbatim.
    Fixed,
    /// An array of `element_size`-byte elements indexed by tick.
    VariableArray {
        /// Size of one element in bytes.
        element_size: u64,
    },
}

impl RegionKind {
    /// Returns true for per-tick arrays.
    #[must_use]
    pub const fn is_variable(self) -> bool {
        matches!(self, Self::VariableArray { .. })
    }
}

/// Length rule for one region, before a capacity is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRule {
    /// A constant number of bytes.
    Bytes(u64),
    /// `(capacity + extra_elements) * element_size` bytes.
    PerTick {
        /// Size of one element in bytes.
        element_size: u64,
        /// Elements held in addition to one per tick.
        extra_elements: u64,
    },
}

/// A named region in a family's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSpec {
    /// Region name, unique within the family.
    pub name: &'static str,
    /// Length rule.
    pub size: SizeRule,
}

impl RegionSpec {
    /// A fixed-size region.
    #[must_use]
    pub const fn fixed(name: &'static str, length: u64) -> Self {
        Self {
            name,
            size: SizeRule::Bytes(length),
        }
    }

    /// A per-tick array with `extra_elements` slots beyond the capacity.
    #[must_use]
    pub const fn per_tick(name: &'static str, element_size: u64, extra_elements: u64) -> Self {
        Self {
            name,
            size: SizeRule::PerTick {
                element_size,
                extra_elements,
            },
        }
    }

    /// The region kind implied by the size rule.
    #[must_use]
    pub const fn kind(&self) -> RegionKind {
        match self.size {
            SizeRule::Bytes(_) => RegionKind::Fixed,
            SizeRule::PerTick { element_size, .. } => RegionKind::VariableArray { element_size },
        }
    }

    /// Byte length at `capacity`, or `None` on overflow.
    #[must_use]
    pub fn length_at(&self, capacity: Capacity) -> Option<u64> {
        match self.size {
            SizeRule::Bytes(length) => Some(length),
            SizeRule::PerTick {
                element_size,
                extra_elements,
            } => capacity
                .checked_add(extra_elements)?
                .checked_mul(element_size),
        }
    }
}

/// A region placed at an absolute offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Region name.
    pub name: &'static str,
    /// Offset of the first byte.
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
    /// Region kind.
    #[serde(flatten)]
    pub kind: RegionKind,
}

impl Region {
    /// Offset one past the last byte.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Byte range usable for slicing a buffer that matches the layout.
    ///
    /// Layout instantiation guarantees every offset fits in `usize`.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset as usize..self.end() as usize
    }

    /// Number of elements for array regions.
    #[must_use]
    pub const fn element_count(&self) -> Option<u64> {
        match self.kind {
            RegionKind::Fixed => None,
            RegionKind::VariableArray { element_size } => self.length.checked_div(element_size),
        }
    }
}

/// A family's layout instantiated at one capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutDescriptor {
    family: &'static str,
    capacity: Capacity,
    regions: Vec<Region>,
    total_length: u64,
}

impl LayoutDescriptor {
    /// Places `specs` left to right from offset 0.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutOverflow`] if any length or offset
    /// overflows `u64`, or the total does not fit in `usize`.
    pub fn build(
        family: &'static str,
        capacity: Capacity,
        specs: &[RegionSpec],
    ) -> CoreResult<Self> {
        let mut regions = Vec::with_capacity(specs.len());
        let mut offset = 0u64;

        for spec in specs {
            let length = spec.length_at(capacity).ok_or_else(|| {
                CoreError::layout_overflow(family, capacity, format!("length of {}", spec.name))
            })?;
            regions.push(Region {
                name: spec.name,
                offset,
                length,
                kind: spec.kind(),
            });
            offset = offset.checked_add(length).ok_or_else(|| {
                CoreError::layout_overflow(family, capacity, format!("end of {}", spec.name))
            })?;
        }

        if usize::try_from(offset).is_err() {
            return Err(CoreError::layout_overflow(
                family,
                capacity,
                format!("total of {offset} bytes exceeds the addressable size"),
            ));
        }

        Ok(Self {
            family,
            capacity,
            regions,
            total_length: offset,
        })
    }

    /// Wraps explicit regions, checking that they tile `[0, total)` with
    /// no gaps or overlaps.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutMismatch`] if the regions are not
    /// contiguous, or [`CoreError::LayoutOverflow`] if they do not fit.
    pub fn from_regions(
        family: &'static str,
        capacity: Capacity,
        regions: Vec<Region>,
    ) -> CoreResult<Self> {
        let mut offset = 0u64;
        for region in &regions {
            if region.offset != offset {
                return Err(CoreError::layout_mismatch(
                    family,
                    format!(
                        "region {} starts at {}, expected {offset}",
                        region.name, region.offset
                    ),
                ));
            }
            offset = offset.checked_add(region.length).ok_or_else(|| {
                CoreError::layout_overflow(family, capacity, format!("end of {}", region.name))
            })?;
        }
        if usize::try_from(offset).is_err() {
            return Err(CoreError::layout_overflow(
                family,
                capacity,
                format!("total of {offset} bytes exceeds the addressable size"),
            ));
        }
        Ok(Self {
            family,
            capacity,
            regions,
            total_length: offset,
        })
    }

    /// Family name.
    #[must_use]
    pub const fn family(&self) -> &'static str {
        self.family
    }

    /// Capacity this layout was instantiated at.
    #[must_use]
    pub const fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Regions in file order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Total file length in bytes.
    #[must_use]
    pub const fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Looks up a region by name.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Regions whose length does not depend on capacity.
    pub fn fixed_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| !r.kind.is_variable())
    }

    /// Per-tick array regions.
    pub fn variable_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.kind.is_variable())
    }

    /// Checks that `actual` bytes at `location` match this layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptInput`] on any difference.
    pub fn check_length(&self, location: &str, actual: u64) -> CoreResult<()> {
        if actual == self.total_length {
            Ok(())
        } else {
            Err(CoreError::corrupt_input(
                location,
                self.family,
                self.capacity,
                self.total_length,
                actual,
            ))
        }
    }

    /// Checks that `other` has the same family, region names and kinds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutMismatch`] naming the first difference.
    pub fn check_compatible(&self, other: &Self) -> CoreResult<()> {
        if self.family != other.family {
            return Err(CoreError::layout_mismatch(
                self.family,
                format!("file family {} vs {}", self.family, other.family),
            ));
        }
        if self.regions.len() != other.regions.len() {
            return Err(CoreError::layout_mismatch(
                self.family,
                format!(
                    "{} regions vs {}",
                    self.regions.len(),
                    other.regions.len()
                ),
            ));
        }
        for (index, (a, b)) in self.regions.iter().zip(&other.regions).enumerate() {
            if a.name != b.name || a.kind != b.kind {
                return Err(CoreError::layout_mismatch(
                    self.family,
                    format!(
                        "region {index}: {} ({:?}) vs {} ({:?})",
                        a.name, a.kind, b.name, b.kind
                    ),
                ));
            }
            if !a.kind.is_variable() && a.length != b.length {
                return Err(CoreError::layout_mismatch(
                    self.family,
                    format!(
                        "fixed region {} is {} bytes vs {}",
                        a.name, a.length, b.length
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// A family of state files sharing one layout shape.
///
/// Implementors only declare their regions; instantiation and parsing are
/// provided.
pub trait FileFamily: Send + Sync {
    /// Stable family name, used in reports and error messages.
    fn name(&self) -> &'static str;

    /// Regions in file order.
    fn region_specs(&self) -> Vec<RegionSpec>;

    /// Instantiates the layout at `capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutOverflow`] if the layout does not fit.
    fn instantiate(&self, capacity: Capacity) -> CoreResult<LayoutDescriptor> {
        LayoutDescriptor::build(self.name(), capacity, &self.region_specs())
    }

    /// Expected file length at `capacity`, without touching any file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutOverflow`] if the layout does not fit.
    fn expected_length(&self, capacity: Capacity) -> CoreResult<u64> {
        Ok(self.instantiate(capacity)?.total_length())
    }

    /// Validates that `buffer` is a file of this family at `capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptInput`] if the length does not match, or
    /// [`CoreError::LayoutOverflow`] if the layout does not fit.
    fn parse(&self, buffer: &[u8], capacity: Capacity) -> CoreResult<LayoutDescriptor> {
        let layout = self.instantiate(capacity)?;
        layout.check_length("buffer", buffer.len() as u64)?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Toy;

    impl FileFamily for Toy {
        fn name(&self) -> &'static str {
            "toy"
        }

        fn region_specs(&self) -> Vec<RegionSpec> {
            vec![
                RegionSpec::fixed("header", 8),
                RegionSpec::per_tick("slots", 4, 2),
                RegionSpec::fixed("trailer", 3),
            ]
        }
    }

    #[test]
    fn offsets_are_contiguous() {
        let layout = Toy.instantiate(10).unwrap();
        let regions = layout.regions();

        assert_eq!(regions[0].offset, 0);
        assert_eq!(regions[1].offset, 8);
        assert_eq!(regions[1].length, 48);
        assert_eq!(regions[2].offset, 56);
        assert_eq!(layout.total_length(), 59);

        for pair in regions.windows(2) {
            assert_eq!(pair[0].end(), pair[1].offset);
        }
        assert_eq!(regions.last().unwrap().end(), layout.total_length());
    }

    #[test]
    fn zero_capacity_keeps_extra_elements() {
        let layout = Toy.instantiate(0).unwrap();
        assert_eq!(layout.region("slots").unwrap().length, 8);
        assert_eq!(layout.region("slots").unwrap().element_count(), Some(2));
    }

    #[test]
    fn overflow_detected() {
        let result = Toy.instantiate(u64::MAX / 2);
        assert!(matches!(result, Err(CoreError::LayoutOverflow { .. })));

        let result = Toy.instantiate(u64::MAX);
        assert!(matches!(result, Err(CoreError::LayoutOverflow { .. })));
    }

    #[test]
    fn parse_checks_length() {
        let buffer = vec![0u8; 59];
        assert!(Toy.parse(&buffer, 10).is_ok());

        let err = Toy.parse(&buffer[..58], 10).unwrap_err();
        assert!(matches!(
            err,
            CoreError::CorruptInput {
                expected: 59,
                actual: 58,
                ..
            }
        ));
    }

    #[test]
    fn fixed_and_variable_partitions() {
        let layout = Toy.instantiate(1).unwrap();
        let fixed: Vec<_> = layout.fixed_regions().map(|r| r.name).collect();
        let variable: Vec<_> = layout.variable_regions().map(|r| r.name).collect();
        assert_eq!(fixed, ["header", "trailer"]);
        assert_eq!(variable, ["slots"]);
    }

    #[test]
    fn compatible_across_capacities() {
        let a = Toy.instantiate(1).unwrap();
        let b = Toy.instantiate(1000).unwrap();
        assert!(a.check_compatible(&b).is_ok());
    }

    #[test]
    fn incompatible_families() {
        let a = Toy.instantiate(1).unwrap();
        let b = TxStatusFamily.instantiate(1).unwrap();
        match a.check_compatible(&b) {
            Err(CoreError::LayoutMismatch { location, message }) => {
                assert_eq!(location, a.family());
                assert!(message.contains("tx-status"));
            }
            other => panic!("expected LayoutMismatch, got {other:?}"),
        }
    }

    #[test]
    fn same_name_different_shape() {
        let a = LayoutDescriptor::build("toy", 4, &[RegionSpec::fixed("a", 4)]).unwrap();
        let b = LayoutDescriptor::build("toy", 4, &[RegionSpec::per_tick("a", 4, 0)]).unwrap();
        let c = LayoutDescriptor::build("toy", 4, &[RegionSpec::fixed("a", 5)]).unwrap();
        assert!(a.check_compatible(&b).is_err());
        assert!(a.check_compatible(&c).is_err());
    }
}
