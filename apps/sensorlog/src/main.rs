//! # sensorlog - Telemetry Collector
//!
//! The main binary for the sensorlog collector.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   apps/sensorlog (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │    CLI      │    │   Config    │    │  Data sources    │     │
//! │  │   (clap)    │    │  (JSON)     │    │ (file/HTTP/CCU)  │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                  ┌──────────────────┐                           │
//! │                  │  sensorlog-core  │                           │
//! │                  │   (THE ENGINE)   │                           │
//! │                  └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Collect with the default configuration file
//! sensorlog
//!
//! # Explicit configuration, faster tick
//! sensorlog -c /etc/sensorlogger.json run --tick-ms 50
//!
//! # Inspect a configuration
//! sensorlog -c sensorlogger.json check --json-mode
//! ```

use clap::Parser;
use sensorlog::{cli, config};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments first: the configuration may name a logfile.
    let cli = cli::Cli::parse();

    // Initialize tracing: SENSORLOG_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("SENSORLOG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "sensorlog=debug,sensorlog_core=debug"
    } else {
        "sensorlog=info,sensorlog_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let file_layer = config::logfile_of(&cli.config).and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Cannot open logfile {}: {}", path.display(), e);
                None
            }
        }
    });

    let console_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the sensorlog startup banner.
fn print_banner() {
    println!(
        r#"
  ___  ___ _ __  ___  ___  _ __| | ___   __ _
 / __|/ _ \ '_ \/ __|/ _ \| '__| |/ _ \ / _` |
 \__ \  __/ | | \__ \ (_) | |  | | (_) | (_| |
 |___/\___|_| |_|___/\___/|_|  |_|\___/ \__, |
                                        |___/

  Telemetry Collector v{}

  Measure • Aggregate • Log
"#,
        env!("CARGO_PKG_VERSION")
    );
}
