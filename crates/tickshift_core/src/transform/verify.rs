//! Post-write verification.
//!
//! Before the output is written, the driver records a SHA-256 fingerprint
//! of every byte range that must survive the transform: each fixed region in
//! full, and the retained prefix of each array region. After writing, the
//! output is re-read, parsed with the new layout, and every fingerprint is
//! recomputed at the new offsets. Zero-filled array tails are checked too.

use crate::error::{CoreError, CoreResult};
use crate::layout::{LayoutDescriptor, RegionKind};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Fingerprint of the bytes of one region that must be carried over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFingerprint {
    /// Region name.
    pub name: &'static str,
    /// Bytes covered, from the start of the region.
    pub retained: u64,
    /// SHA-256 of those bytes.
    pub digest: [u8; 32],
}

/// Fingerprints of everything the output must preserve.
#[derive(Debug, Clone, Default)]
pub struct Fingerprints {
    regions: Vec<RegionFingerprint>,
}

/// Result of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VerificationSummary {
    /// Output length that was checked.
    pub length: u64,
    /// Regions whose boundaries were checked.
    pub regions_checked: usize,
    /// Bytes whose fingerprints were compared.
    pub bytes_fingerprinted: u64,
    /// Zero-filled bytes confirmed zero.
    pub zero_bytes_checked: u64,
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

impl Fingerprints {
    /// Fingerprints `input` (laid out as `old`) for a resize to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LayoutMismatch`] if the layouts are not
    /// compatible, or [`CoreError::CorruptInput`] if `input` is not exactly
    /// `old`'s length.
    pub fn capture(
        input: &[u8],
        old: &LayoutDescriptor,
        new: &LayoutDescriptor,
    ) -> CoreResult<Self> {
        old.check_compatible(new)?;
        old.check_length("buffer", input.len() as u64)?;

        let regions = old
            .regions()
            .iter()
            .zip(new.regions())
            .map(|(o, n)| {
                let retained = o.length.min(n.length);
                let start = o.offset as usize;
                let bytes = &input[start..start + retained as usize];
                RegionFingerprint {
                    name: o.name,
                    retained,
                    digest: sha256(bytes),
                }
            })
            .collect();
        Ok(Self { regions })
    }

    /// Recorded fingerprints, in file order.
    #[must_use]
    pub fn regions(&self) -> &[RegionFingerprint] {
        &self.regions
    }
}

/// Verifies a written output against the new layout.
///
/// Checks the total length, that the layout tiles the output exactly, that
/// grown array tails are zero, and, if `fingerprints` is given, that every
/// carried-over range hashes to its recorded value.
///
/// # Errors
///
/// Returns [`CoreError::VerificationFailed`] describing the first mismatch.
pub fn verify_output(
    location: &str,
    output: &[u8],
    new: &LayoutDescriptor,
    fingerprints: Option<&Fingerprints>,
) -> CoreResult<VerificationSummary> {
    new.check_length(location, output.len() as u64)
        .map_err(|e| CoreError::verification_failed(location, e.to_string()))?;

    let mut summary = VerificationSummary {
        length: output.len() as u64,
        ..VerificationSummary::default()
    };

    let mut expected_offset = 0u64;
    for region in new.regions() {
        if region.offset != expected_offset {
            return Err(CoreError::verification_failed(
                location,
                format!(
                    "region {} starts at {}, previous region ends at {expected_offset}",
                    region.name, region.offset
                ),
            ));
        }
        expected_offset = region.end();
        summary.regions_checked += 1;
    }
    if expected_offset != summary.length {
        return Err(CoreError::verification_failed(
            location,
            format!(
                "regions end at {expected_offset}, output is {} bytes",
                summary.length
            ),
        ));
    }

    let Some(fingerprints) = fingerprints else {
        return Ok(summary);
    };

    if fingerprints.regions.len() != new.regions().len() {
        return Err(CoreError::verification_failed(
            location,
            format!(
                "{} fingerprints for {} regions",
                fingerprints.regions.len(),
                new.regions().len()
            ),
        ));
    }

    for (print, region) in fingerprints.regions.iter().zip(new.regions()) {
        let bytes = &output[region.range()];
        let retained = print.retained as usize;
        if print.name != region.name || retained > bytes.len() {
            return Err(CoreError::verification_failed(
                location,
                format!("fingerprint {} does not fit region {}", print.name, region.name),
            ));
        }

        if sha256(&bytes[..retained]) != print.digest {
            return Err(CoreError::verification_failed(
                location,
                format!(
                    "region {} at offset {}: first {retained} bytes differ from the input",
                    region.name, region.offset
                ),
            ));
        }
        summary.bytes_fingerprinted += print.retained;

        if let RegionKind::VariableArray { .. } = region.kind {
            let tail = &bytes[retained..];
            if let Some(pos) = tail.iter().position(|&b| b != 0) {
                return Err(CoreError::verification_failed(
                    location,
                    format!(
                        "region {}: zero-filled tail has data at offset {}",
                        region.name,
                        region.offset + print.retained + pos as u64
                    ),
                ));
            }
            summary.zero_bytes_checked += tail.len() as u64;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FileFamily, TxStatusFamily};
    use crate::resize::resize;

    fn filled(len: u64) -> Vec<u8> {
        (0..len).map(|i| (i % 7) as u8 + 1).collect()
    }

    #[test]
    fn resized_output_verifies() {
        let old = TxStatusFamily.instantiate(10).unwrap();
        let new = TxStatusFamily.instantiate(30).unwrap();
        let input = filled(old.total_length());

        let prints = Fingerprints::capture(&input, &old, &new).unwrap();
        let outcome = resize(&input, &old, &new).unwrap();
        let summary = verify_output("out", &outcome.buffer, &new, Some(&prints)).unwrap();

        assert_eq!(summary.length, new.total_length());
        assert_eq!(summary.regions_checked, 4);
        assert_eq!(summary.bytes_fingerprinted, old.total_length());
        assert_eq!(summary.zero_bytes_checked, 2 * 20 * 4);
    }

    #[test]
    fn shrunk_output_verifies() {
        let old = TxStatusFamily.instantiate(30).unwrap();
        let new = TxStatusFamily.instantiate(10).unwrap();
        let input = filled(old.total_length());

        let prints = Fingerprints::capture(&input, &old, &new).unwrap();
        let outcome = resize(&input, &old, &new).unwrap();
        let summary = verify_output("out", &outcome.buffer, &new, Some(&prints)).unwrap();
        assert_eq!(summary.bytes_fingerprinted, new.total_length());
        assert_eq!(summary.zero_bytes_checked, 0);
    }

    #[test]
    fn capture_rejects_short_input() {
        let old = TxStatusFamily.instantiate(10).unwrap();
        let new = TxStatusFamily.instantiate(20).unwrap();
        let input = filled(old.total_length() - 1);

        match Fingerprints::capture(&input, &old, &new) {
            Err(CoreError::CorruptInput {
                expected, actual, ..
            }) => {
                assert_eq!(expected, old.total_length());
                assert_eq!(actual, old.total_length() - 1);
            }
            other => panic!("expected CorruptInput, got {other:?}"),
        }
        assert!(Fingerprints::capture(&[], &old, &new).is_err());
    }

    #[test]
    fn wrong_length_fails() {
        let new = TxStatusFamily.instantiate(10).unwrap();
        let output = vec![0u8; new.total_length() as usize + 4];
        assert!(matches!(
            verify_output("out", &output, &new, None),
            Err(CoreError::VerificationFailed { .. })
        ));
    }

    #[test]
    fn altered_fixed_region_fails() {
        let old = TxStatusFamily.instantiate(10).unwrap();
        let new = TxStatusFamily.instantiate(20).unwrap();
        let input = filled(old.total_length());

        let prints = Fingerprints::capture(&input, &old, &new).unwrap();
        let mut output = resize(&input, &old, &new).unwrap().buffer;
        let last = output.len() - 1;
        output[last] ^= 0xFF;

        let err = verify_output("out", &output, &new, Some(&prints)).unwrap_err();
        assert!(err.to_string().contains("confirmed_tx_current_epoch_begin_tick"));
    }

    #[test]
    fn dirty_zero_tail_fails() {
        let old = TxStatusFamily.instantiate(10).unwrap();
        let new = TxStatusFamily.instantiate(20).unwrap();
        let input = filled(old.total_length());

        let prints = Fingerprints::capture(&input, &old, &new).unwrap();
        let mut output = resize(&input, &old, &new).unwrap().buffer;
        let tail_byte = (110 * 4 + 3) as usize;
        output[tail_byte] = 1;

        let err = verify_output("out", &output, &new, Some(&prints)).unwrap_err();
        assert!(err.to_string().contains("zero-filled tail"));
    }

    #[test]
    fn without_fingerprints_only_boundaries_are_checked() {
        let new = TxStatusFamily.instantiate(5).unwrap();
        let output = filled(new.total_length());
        let summary = verify_output("out", &output, &new, None).unwrap();
        assert_eq!(summary.bytes_fingerprinted, 0);
        assert_eq!(summary.regions_checked, 4);
    }
}
