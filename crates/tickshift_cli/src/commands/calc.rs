//! Capacity table command.

use crate::error::CliResult;
use tickshift_core::{
    CapacityFormula, FileFamily, LogStateFamily, ProtocolFormula, TickDuration, TxStatusFamily,
};

/// Durations shown when none are given.
pub const DEFAULT_DURATIONS: [u64; 5] = [1000, 2000, 3000, 4000, 5000];

/// One row of the capacity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRow {
    /// Tick duration in milliseconds.
    pub duration_ms: u64,
    /// Ticks per epoch.
    pub capacity: u64,
    /// Transaction status snapshot size in bytes.
    pub tx_status_bytes: u64,
    /// Logging state file size in bytes.
    pub log_state_bytes: u64,
}

/// Computes table rows for `durations`.
pub fn rows(durations: &[u64]) -> CliResult<Vec<CapacityRow>> {
    let formula = ProtocolFormula::default();
    let log_state = LogStateFamily::default();

    durations
        .iter()
        .map(|&ms| -> CliResult<CapacityRow> {
            let capacity = formula.capacity_for(TickDuration::from_millis(ms)?)?;
            Ok(CapacityRow {
                duration_ms: ms,
                capacity,
                tx_status_bytes: TxStatusFamily.expected_length(capacity)?,
                log_state_bytes: log_state.expected_length(capacity)?,
            })
        })
        .collect()
}

/// Prints the capacity table.
pub fn run(durations: &[u64]) -> CliResult<()> {
    let durations = if durations.is_empty() {
        &DEFAULT_DURATIONS[..]
    } else {
        durations
    };
    let rows = rows(durations)?;

    println!(
        "{:>12}  {:>10}  {:>16}  {:>16}",
        "duration ms", "ticks", "tx-status bytes", "log-state bytes"
    );
    for row in &rows {
        println!(
            "{:>12}  {:>10}  {:>16}  {:>16}",
            row.duration_ms, row.capacity, row.tx_status_bytes, row.log_state_bytes
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_node() {
        let rows = rows(&DEFAULT_DURATIONS).unwrap();
        let capacities: Vec<u64> = rows.iter().map(|r| r.capacity).collect();
        assert_eq!(capacities, [605_020, 302_848, 202_124, 151_424, 121_004]);
        assert_eq!(rows[2].tx_status_bytes, 1_617_800);
        assert_eq!(rows[2].log_state_bytes, 951_108_496);
    }

    #[test]
    fn log_state_grows_by_digests() {
        let rows = rows(&[3000, 2000]).unwrap();
        let delta = rows[1].log_state_bytes - rows[0].log_state_bytes;
        assert_eq!(delta, (302_848 - 202_124) * 32);
    }

    #[test]
    fn invalid_duration_fails() {
        let err = rows(&[999]).unwrap_err();
        assert_eq!(err.kind(), "InvalidDuration");
    }
}
