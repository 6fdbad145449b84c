//! # sensorlog CLI Module
//!
//! This module implements the CLI interface for sensorlog.
//!
//! ## Available Commands
//!
//! - `run` - Start collecting (default when no command is given)
//! - `check` - Load the configuration and summarize it
//! - `print` - Re-emit the configuration through the document printer

mod commands;

use clap::{Parser, Subcommand};
use sensorlog_core::SensorlogError;
use std::path::PathBuf;

pub use commands::*;

/// Tick interval used when `run` is implied.
pub const DEFAULT_TICK_MS: u64 = 100;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// sensorlog - telemetry collector
///
/// Polls sensors, keeps a bounded history per sensor and writes aggregated
/// rows to cycle-aligned log files.
#[derive(Parser, Debug)]
#[command(name = "sensorlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start collecting
    Run {
        /// Interval between two scheduler ticks in milliseconds
        #[arg(short, long, default_value_t = DEFAULT_TICK_MS)]
        tick_ms: u64,
    },

    /// Load the configuration and print a summary
    Check,

    /// Parse the configuration and print it back
    Print,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI command.
pub async fn execute(cli: Cli) -> Result<(), SensorlogError> {
    match cli.command {
        Some(Commands::Run { tick_ms }) => cmd_run(cli.config, tick_ms).await,
        Some(Commands::Check) => cmd_check(&cli.config, cli.json_mode, cli.verbose),
        Some(Commands::Print) => cmd_print(&cli.config),
        None => cmd_run(cli.config, DEFAULT_TICK_MS).await,
    }
}
