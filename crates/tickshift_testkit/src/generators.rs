//! Property-based test generators using proptest.
//!
//! Provides strategies for tick durations, capacities and synthetic state
//! files that keep the layout invariants.

use proptest::prelude::*;
use tickshift_core::{Capacity, FileFamily, TxStatusFamily};

/// Strategy for tick durations the protocol formula accepts, in
/// milliseconds.
pub fn duration_ms_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => (1u64..=10).prop_map(|s| s * 1000),
        1 => 1000u64..=120_000,
    ]
}

/// Strategy for small capacities that keep files quick to build.
pub fn capacity_strategy() -> impl Strategy<Value = Capacity> {
    0u64..2_000
}

/// Strategy for a pair of capacities to resize between.
pub fn capacity_pair_strategy() -> impl Strategy<Value = (Capacity, Capacity)> {
    (capacity_strategy(), capacity_strategy())
}

/// Strategy for a tx-status snapshot: its capacity and sparse contents.
///
/// About one slot in eight is non-zero; the epoch begin ticks are random.
pub fn tx_status_strategy() -> impl Strategy<Value = (Capacity, Vec<u8>)> {
    capacity_strategy().prop_flat_map(|capacity| {
        let length = TxStatusFamily
            .expected_length(capacity)
            .expect("small capacities always fit") as usize;
        let word = prop_oneof![7 => Just(0u32), 1 => any::<u32>()];
        (
            Just(capacity),
            prop::collection::vec(word, length / 4).prop_map(|words| {
                words.into_iter().flat_map(u32::to_le_bytes).collect::<Vec<u8>>()
            }),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickshift_core::transform::{verify_output, Fingerprints};
    use tickshift_core::{capacity_for_duration, resize, TickDuration, NUMBER_OF_COMPUTORS};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn generated_durations_have_capacities(ms in duration_ms_strategy()) {
            let capacity = capacity_for_duration(ms).unwrap();
            prop_assert!(capacity > 0);
            prop_assert_eq!(capacity % NUMBER_OF_COMPUTORS, 0);
            prop_assert!(TickDuration::from_millis(ms).is_ok());
        }

        #[test]
        fn generated_snapshots_match_layout((capacity, data) in tx_status_strategy()) {
            prop_assert!(TxStatusFamily.parse(&data, capacity).is_ok());
        }

        #[test]
        fn resized_snapshots_verify(
            (capacity, data) in tx_status_strategy(),
            new_capacity in capacity_strategy(),
        ) {
            let old = TxStatusFamily.instantiate(capacity).unwrap();
            let new = TxStatusFamily.instantiate(new_capacity).unwrap();

            let prints = Fingerprints::capture(&data, &old, &new).unwrap();
            let outcome = resize(&data, &old, &new).unwrap();
            let summary = verify_output("generated", &outcome.buffer, &new, Some(&prints)).unwrap();

            prop_assert_eq!(summary.length, new.total_length());
            prop_assert_eq!(outcome.has_data_loss(), outcome.non_zero_bytes_discarded() > 0);
            if new_capacity >= capacity {
                prop_assert!(!outcome.has_data_loss());
            }
        }
    }
}
