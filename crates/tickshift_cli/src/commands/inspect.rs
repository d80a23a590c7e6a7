//! Inspect command implementation.

use super::format_size;
use crate::error::CliResult;
use serde::Serialize;
use std::path::Path;
use tickshift_core::layout::log_state::{regions as log_regions, DIGEST_SIZE};
use tickshift_core::{
    CapacityFormula, FileFamily, LayoutDescriptor, LogStateFamily, LogStateVariables,
    ProtocolFormula, Region, TickDuration, TxStatusFamily, TxStatusSummary,
};
use tickshift_storage::{FileBackend, StorageBackend};

/// State file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File path.
    pub path: String,
    /// File family.
    pub family: &'static str,
    /// Tick duration the file was written with.
    pub duration_ms: u64,
    /// Ticks per epoch at that duration.
    pub capacity: u64,
    /// File size in bytes.
    pub file_size: u64,
    /// Region boundaries.
    pub regions: Vec<Region>,
    /// Logging state details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_state: Option<LogStateStats>,
    /// Transaction status details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_status: Option<TxStatusSummary>,
}

/// Details of a logging state file.
#[derive(Debug, Serialize)]
pub struct LogStateStats {
    /// Decoded variables block.
    pub variables: LogStateVariables,
    /// Digest slots holding a non-zero digest.
    pub populated_digests: u64,
}

/// Runs the inspect command.
pub fn run(family: &dyn FileFamily, path: &Path, duration_ms: u64, json: bool) -> CliResult<()> {
    let result = inspect(family, path, duration_ms)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }
    Ok(())
}

/// Reads the file at `path` and collects its statistics.
pub fn inspect(family: &dyn FileFamily, path: &Path, duration_ms: u64) -> CliResult<InspectResult> {
    let duration = TickDuration::from_millis(duration_ms)?;
    let capacity = ProtocolFormula::default().capacity_for(duration)?;
    let layout = family.instantiate(capacity)?;

    let backend = FileBackend::open(path)?;
    let file_size = backend.size()?;
    layout.check_length(&backend.location(), file_size)?;

    let mut result = InspectResult {
        path: path.display().to_string(),
        family: family.name(),
        duration_ms,
        capacity,
        file_size,
        regions: layout.regions().to_vec(),
        log_state: None,
        tx_status: None,
    };

    match family.name() {
        LogStateFamily::NAME => result.log_state = Some(log_state_stats(&backend, &layout)?),
        TxStatusFamily::NAME => {
            let data = backend.read_all()?;
            let summary =
                TxStatusSummary::scan(&data, &layout).map_err(|e| e.at(backend.location()))?;
            result.tx_status = Some(summary);
        }
        _ => {}
    }

    Ok(result)
}

fn read_region(backend: &dyn StorageBackend, region: Option<&Region>) -> CliResult<Vec<u8>> {
    match region {
        Some(region) => Ok(backend.read_at(region.offset, region.length as usize)?),
        None => Ok(Vec::new()),
    }
}

fn log_state_stats(
    backend: &dyn StorageBackend,
    layout: &LayoutDescriptor,
) -> CliResult<LogStateStats> {
    let variables = read_region(backend, layout.region(log_regions::VARIABLES))?;
    let digests = read_region(backend, layout.region(log_regions::DIGESTS))?;

    let populated_digests = digests
        .chunks_exact(DIGEST_SIZE as usize)
        .filter(|digest| digest.iter().any(|&b| b != 0))
        .count() as u64;

    Ok(LogStateStats {
        variables: LogStateVariables::decode(&variables)?,
        populated_digests,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("tickshift State File Inspection");
    println!("===============================");
    println!();
    println!("Path:     {}", result.path);
    println!("Family:   {}", result.family);
    println!(
        "Duration: {} ms ({} ticks per epoch)",
        result.duration_ms, result.capacity
    );
    println!(
        "Size:     {} ({} bytes)",
        format_size(result.file_size),
        result.file_size
    );
    println!();
    println!("Regions:");
    for region in &result.regions {
        let kind = match region.element_count() {
            Some(count) => format!("{count} elements"),
            None => "fixed".to_string(),
        };
        println!(
            "  {:<40} offset {:>12}  length {:>12}  {kind}",
            region.name, region.offset, region.length
        );
    }

    if let Some(stats) = &result.log_state {
        let v = &stats.variables;
        println!();
        println!("Log variables:");
        println!("  log buffer tail:   {}", v.log_buffer_tail);
        println!("  log id:            {}", v.log_id);
        println!("  tick begin:        {}", v.tick_begin);
        println!("  last updated tick: {}", v.last_updated_tick);
        println!("  current tx id:     {}", v.current_tx_id);
        println!("  current tick:      {}", v.current_tick);
        println!("  populated digests: {}", stats.populated_digests);
    }

    if let Some(summary) = &result.tx_status {
        println!();
        println!("Transaction status:");
        println!("  slots per array:          {}", summary.slots);
        println!("  non-zero counters:        {}", summary.non_zero_counters);
        println!("  non-zero index starts:    {}", summary.non_zero_index_starts);
        match summary.highest_used_slot {
            Some(slot) => println!("  highest used slot:        {slot}"),
            None => println!("  highest used slot:        none"),
        }
        println!(
            "  previous epoch begin tick: {}",
            summary.previous_epoch_begin_tick
        );
        println!(
            "  current epoch begin tick:  {}",
            summary.current_epoch_begin_tick
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tickshift_core::layout::tx_status::regions as tx;

    #[test]
    fn tx_status_statistics() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshotTxStatusData");
        let layout = TxStatusFamily.instantiate(202_124).unwrap();
        let mut data = vec![0u8; layout.total_length() as usize];
        let counter = layout.region(tx::TICK_TX_COUNTER).unwrap().offset as usize;
        data[counter + 4 * 150..counter + 4 * 151].copy_from_slice(&9u32.to_le_bytes());
        let prev = layout.region(tx::PREVIOUS_EPOCH_BEGIN_TICK).unwrap().offset as usize;
        data[prev..prev + 4].copy_from_slice(&16_000_000u32.to_le_bytes());
        fs::write(&path, data).unwrap();

        let result = inspect(&TxStatusFamily, &path, 3000).unwrap();
        let summary = result.tx_status.unwrap();
        assert_eq!(result.capacity, 202_124);
        assert_eq!(summary.non_zero_counters, 1);
        assert_eq!(summary.highest_used_slot, Some(150));
        assert_eq!(summary.previous_epoch_begin_tick, 16_000_000);
        assert!(result.log_state.is_none());
    }

    #[test]
    fn log_state_variables_and_digests() {
        let family = LogStateFamily::new(
            tickshift_core::LogStateGeometry::new()
                .log_buffer_page_size(64)
                .pmap_page_entries(4)
                .imap_page_entries(1),
        );
        let layout = family.instantiate(121_004).unwrap();
        let mut data = vec![0u8; layout.total_length() as usize];

        let digests = layout.region(log_regions::DIGESTS).unwrap().offset as usize;
        data[digests + 32 * 5] = 0xAB;
        data[digests + 32 * 9 + 31] = 0x01;
        let variables = LogStateVariables {
            log_buffer_tail: 4096,
            log_id: 77,
            tick_begin: 16_000_000,
            last_updated_tick: 16_000_009,
            current_tx_id: 3,
            current_tick: 16_000_010,
        };
        let range = layout.region(log_regions::VARIABLES).unwrap().range();
        data[range].copy_from_slice(&variables.encode());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logEventState.db");
        fs::write(&path, data).unwrap();

        let result = inspect(&family, &path, 5000).unwrap();
        let stats = result.log_state.unwrap();
        assert_eq!(stats.variables, variables);
        assert_eq!(stats.populated_digests, 2);
        assert!(result.tx_status.is_none());
    }

    #[test]
    fn wrong_duration_is_corrupt_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshotTxStatusData");
        fs::write(&path, vec![0u8; 1_617_800]).unwrap();

        let err = inspect(&TxStatusFamily, &path, 2000).unwrap_err();
        assert_eq!(err.kind(), "CorruptInput");
    }

    #[test]
    fn json_report_has_regions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshotTxStatusData");
        fs::write(&path, vec![0u8; 1_617_800]).unwrap();

        let result = inspect(&TxStatusFamily, &path, 3000).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["regions"][0]["name"], "tick_tx_counter");
        assert_eq!(json["regions"][0]["kind"], "variable_array");
        assert_eq!(json["regions"][0]["element_size"], 4);
        assert_eq!(json["tx_status"]["slots"], 202_224);
        assert!(json.get("log_state").is_none());
    }
}
