//! Resize command shared by `log-state` and `tx-status`.

use super::format_size;
use crate::error::CliResult;
use std::path::Path;
use tickshift_core::{
    transform_file, FileFamily, ProtocolFormula, TickDuration, TransformConfig, TransformPlan,
    TransformReport, Transformer,
};
use tracing::info;

/// Arguments of one resize run.
pub struct AdjustRequest<'a> {
    /// Family of the file being resized.
    pub family: &'a dyn FileFamily,
    /// Input path.
    pub input: &'a Path,
    /// Output path; the input is overwritten when absent.
    pub output: Option<&'a Path>,
    /// Tick duration the input was written with.
    pub old_ms: u64,
    /// Tick duration to resize for.
    pub new_ms: u64,
    /// Whether to back up the input before overwriting it.
    pub backup: bool,
    /// Whether an existing backup may be replaced.
    pub overwrite_backup: bool,
    /// Whether to print the capacity derivation.
    pub show_calculation: bool,
}

/// Runs the resize and prints a report.
pub fn run(request: &AdjustRequest<'_>) -> CliResult<()> {
    let old = TickDuration::from_millis(request.old_ms)?;
    let new = TickDuration::from_millis(request.new_ms)?;
    let formula = ProtocolFormula::default();
    let config = TransformConfig::new()
        .backup(request.backup)
        .overwrite_backup(request.overwrite_backup);

    let plan = Transformer::new(request.family, &formula).plan(old, new)?;
    if request.show_calculation {
        print_calculation(&formula, &plan)?;
    }

    info!(
        family = request.family.name(),
        input = %request.input.display(),
        "resizing {} -> {}",
        old,
        new
    );

    let report = transform_file(
        request.family,
        &formula,
        &config,
        old,
        new,
        request.input,
        request.output,
    )?;

    print_report(&report);
    Ok(())
}

fn print_calculation(formula: &ProtocolFormula, plan: &TransformPlan) -> CliResult<()> {
    println!("Capacity calculation");
    println!("====================");
    println!("{}", formula.breakdown(plan.old_duration)?);
    println!();
    println!("{}", formula.breakdown(plan.new_duration)?);
    println!();
    println!("File sizes ({}):", plan.family);
    println!(
        "  old: {} bytes ({} ticks)",
        plan.old_length(),
        plan.old_capacity
    );
    println!(
        "  new: {} bytes ({} ticks)",
        plan.new_length(),
        plan.new_capacity
    );
    println!("  delta: {:+} bytes", plan.size_delta());
    println!();
    Ok(())
}

fn print_report(report: &TransformReport) {
    println!("✓ Resized {} file", report.family);
    println!("  Input:    {}", report.input_location);
    println!("  Output:   {}", report.output_location);
    if let Some(backup) = &report.backup_location {
        println!("  Backup:   {backup}");
    }
    println!(
        "  Duration: {} -> {}",
        report.old_duration, report.new_duration
    );
    println!(
        "  Capacity: {} -> {} ticks",
        report.old_capacity, report.new_capacity
    );
    println!(
        "  Size:     {} -> {} ({:+} bytes)",
        format_size(report.old_length),
        format_size(report.new_length),
        report.size_delta()
    );
    println!();
    println!("Regions:");
    for change in &report.changes {
        let action = if change.bytes_zero_filled > 0 {
            format!("+{} bytes zero-filled", change.bytes_zero_filled)
        } else if change.bytes_truncated > 0 {
            format!("-{} bytes truncated", change.bytes_truncated)
        } else {
            "unchanged".to_string()
        };
        println!(
            "  {:<24} {:>14} -> {:>14}  {action}",
            change.name, change.old_length, change.new_length
        );
    }
    println!();
    println!(
        "✓ Verified: {} regions, {} bytes fingerprinted, {} zero bytes checked",
        report.verification.regions_checked,
        report.verification.bytes_fingerprinted,
        report.verification.zero_bytes_checked
    );

    if report.data_loss {
        println!();
        println!("!!! WARNING: DATA LOSS !!!");
        println!(
            "  Truncation discarded {} non-zero bytes:",
            report.non_zero_bytes_discarded()
        );
        for change in report.changes.iter().filter(|c| c.is_lossy()) {
            println!(
                "    {}: {} non-zero bytes past offset {}",
                change.name,
                change.non_zero_bytes_discarded,
                change.new_offset + change.new_length
            );
        }
        match &report.backup_location {
            Some(backup) => println!("  The original file is preserved at {backup}"),
            None => println!("  No backup was taken."),
        }
    }
}
