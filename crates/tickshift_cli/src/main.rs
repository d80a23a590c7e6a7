//! tickshift CLI
//!
//! Resizes a node's tick-indexed state files after its target tick
//! duration changes.
//!
//! # Commands
//!
//! - `log-state` - Resize the logging state file (`logEventState.db`)
//! - `tx-status` - Resize the transaction status snapshot (`snapshotTxStatusData`)
//! - `calc` - Print epoch capacities and file sizes for tick durations
//! - `inspect` - Display region boundaries and usage of a state file

mod commands;
mod error;

use clap::{Args, Parser, Subcommand, ValueEnum};
use error::{CliError, CliResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tickshift_core::{LogStateFamily, LogStateGeometry, TxStatusFamily};
use tracing_subscriber::EnvFilter;

/// Resize tick-indexed ledger state files between tick durations.
#[derive(Parser)]
#[command(name = "tickshift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the resizing commands.
#[derive(Args)]
struct ResizeOptions {
    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not copy the input to `<FILEPATH>.backup` before overwriting it
    #[arg(long)]
    no_backup: bool,

    /// Replace an existing `<FILEPATH>.backup`
    #[arg(long)]
    overwrite_backup: bool,

    /// Print how each capacity is derived
    #[arg(long)]
    show_calculation: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resize the logging state file
    LogState {
        /// Path to the logging state file
        filepath: PathBuf,

        /// Tick duration the file was written with, in milliseconds
        #[arg(long, value_name = "MS")]
        old_duration: u64,

        /// Tick duration to resize for, in milliseconds
        #[arg(long, value_name = "MS")]
        new_duration: u64,

        /// Size of the KangarooTwelve state block in bytes
        #[arg(long, value_name = "BYTES", default_value_t = 448)]
        k12_state_size: u64,

        #[command(flatten)]
        options: ResizeOptions,
    },

    /// Resize the transaction status snapshot
    ///
    /// Accepts either the flag form or the positional form
    /// `tx-status INPUT OUTPUT OLD_MS NEW_MS`.
    TxStatus {
        /// Path to the snapshot file
        filepath: PathBuf,

        /// Output path (positional form)
        #[arg(value_name = "OUTPUT", conflicts_with = "output")]
        positional_output: Option<PathBuf>,

        /// Old tick duration in milliseconds (positional form)
        #[arg(value_name = "OLD_MS", conflicts_with = "old_duration")]
        positional_old: Option<u64>,

        /// New tick duration in milliseconds (positional form)
        #[arg(value_name = "NEW_MS", conflicts_with = "new_duration")]
        positional_new: Option<u64>,

        /// Tick duration the file was written with, in milliseconds
        #[arg(long, value_name = "MS")]
        old_duration: Option<u64>,

        /// Tick duration to resize for, in milliseconds
        #[arg(long, value_name = "MS")]
        new_duration: Option<u64>,

        #[command(flatten)]
        options: ResizeOptions,
    },

    /// Print epoch capacities and file sizes for tick durations
    Calc {
        /// Tick durations in milliseconds (default: 1000 2000 3000 4000 5000)
        durations: Vec<u64>,
    },

    /// Display region boundaries and usage of a state file
    Inspect {
        /// Which kind of state file
        #[arg(value_enum)]
        family: FamilyArg,

        /// Path to the state file
        filepath: PathBuf,

        /// Tick duration the file was written with, in milliseconds
        #[arg(long, value_name = "MS")]
        duration: u64,

        /// Size of the KangarooTwelve state block (log-state only)
        #[arg(long, value_name = "BYTES", default_value_t = 448)]
        k12_state_size: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// State file family selector.
#[derive(Clone, Copy, ValueEnum)]
enum FamilyArg {
    /// Logging state file
    LogState,
    /// Transaction status snapshot
    TxStatus,
}

/// Report format.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> CliResult<()> {
    match command {
        Commands::LogState {
            filepath,
            old_duration,
            new_duration,
            k12_state_size,
            options,
        } => {
            let family =
                LogStateFamily::new(LogStateGeometry::new().k12_state_size(k12_state_size));
            commands::adjust::run(&commands::adjust::AdjustRequest {
                family: &family,
                input: &filepath,
                output: options.output.as_deref(),
                old_ms: old_duration,
                new_ms: new_duration,
                backup: !options.no_backup,
                overwrite_backup: options.overwrite_backup,
                show_calculation: options.show_calculation,
            })
        }
        Commands::TxStatus {
            filepath,
            positional_output,
            positional_old,
            positional_new,
            old_duration,
            new_duration,
            options,
        } => {
            let old_ms = old_duration
                .or(positional_old)
                .ok_or_else(|| CliError::usage("tx-status needs --old-duration or OLD_MS"))?;
            let new_ms = new_duration
                .or(positional_new)
                .ok_or_else(|| CliError::usage("tx-status needs --new-duration or NEW_MS"))?;
            let output = options.output.or(positional_output);

            commands::adjust::run(&commands::adjust::AdjustRequest {
                family: &TxStatusFamily,
                input: &filepath,
                output: output.as_deref(),
                old_ms,
                new_ms,
                backup: !options.no_backup,
                overwrite_backup: options.overwrite_backup,
                show_calculation: options.show_calculation,
            })
        }
        Commands::Calc { durations } => commands::calc::run(&durations),
        Commands::Inspect {
            family,
            filepath,
            duration,
            k12_state_size,
            format,
        } => {
            let log_state =
                LogStateFamily::new(LogStateGeometry::new().k12_state_size(k12_state_size));
            let family: &dyn tickshift_core::FileFamily = match family {
                FamilyArg::LogState => &log_state,
                FamilyArg::TxStatus => &TxStatusFamily,
            };
            commands::inspect::run(family, &filepath, duration, format == OutputFormat::Json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tx_status_positional_form() {
        let cli = Cli::try_parse_from(["tickshift", "tx-status", "in", "out", "3000", "2000"])
            .unwrap();
        let Commands::TxStatus {
            filepath,
            positional_output,
            positional_old,
            positional_new,
            ..
        } = cli.command
        else {
            panic!("expected tx-status");
        };
        assert_eq!(filepath, PathBuf::from("in"));
        assert_eq!(positional_output, Some(PathBuf::from("out")));
        assert_eq!(positional_old, Some(3000));
        assert_eq!(positional_new, Some(2000));
    }

    #[test]
    fn tx_status_flag_form() {
        let cli = Cli::try_parse_from([
            "tickshift",
            "tx-status",
            "in",
            "--old-duration",
            "3000",
            "--new-duration",
            "2000",
            "--no-backup",
        ])
        .unwrap();
        let Commands::TxStatus {
            old_duration,
            new_duration,
            options,
            ..
        } = cli.command
        else {
            panic!("expected tx-status");
        };
        assert_eq!(old_duration, Some(3000));
        assert_eq!(new_duration, Some(2000));
        assert!(options.no_backup);
    }

    #[test]
    fn tx_status_rejects_both_output_forms() {
        let result =
            Cli::try_parse_from(["tickshift", "tx-status", "in", "out", "--output", "other"]);
        assert!(result.is_err());
    }

    #[test]
    fn log_state_requires_durations() {
        assert!(Cli::try_parse_from(["tickshift", "log-state", "file"]).is_err());

        let cli = Cli::try_parse_from([
            "tickshift",
            "-v",
            "log-state",
            "file",
            "--old-duration",
            "3000",
            "--new-duration",
            "2000",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::LogState {
                k12_state_size: 448,
                ..
            }
        ));
    }

    #[test]
    fn tx_status_without_durations_is_usage_error() {
        let cli = Cli::try_parse_from(["tickshift", "tx-status", "in"]).unwrap();
        let err = run(cli.command).unwrap_err();
        assert_eq!(err.kind(), "UsageError");
    }
}
