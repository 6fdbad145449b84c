//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{self, Settings, SourceSpec};
use crate::runtime;
use sensorlog_core::SensorlogError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Collect until Ctrl-C.
///
/// The engine is synchronous, so the tick loop runs on a blocking worker;
/// the signal only raises a flag that the loop checks between ticks.
pub async fn cmd_run(config_path: PathBuf, tick_ms: u64) -> Result<(), SensorlogError> {
    let settings = Settings::load(&config_path)?;

    println!("sensorlog collector starting...");
    println!();
    println!("Configuration: {}", config_path.display());
    println!("  Sensors:   {}", settings.sensors.len());
    println!("  Logbooks:  {}", settings.logbooks.len());
    println!("  Tick:      {} ms", tick_ms);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);
    let tick = Duration::from_millis(tick_ms.max(1));
    let mut worker =
        tokio::task::spawn_blocking(move || runtime::run(&settings, tick, &worker_stop));

    tokio::select! {
        result = &mut worker => return joined(result),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| SensorlogError::Io(format!("Cannot listen for Ctrl-C: {e}")))?;
            tracing::info!("shutdown requested");
            stop.store(true, Ordering::Relaxed);
        }
    }

    joined(worker.await)
}

fn joined(
    result: Result<Result<(), SensorlogError>, tokio::task::JoinError>,
) -> Result<(), SensorlogError> {
    result.map_err(|e| SensorlogError::Io(format!("Collector worker failed: {e}")))?
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Load the configuration and summarize what would run.
pub fn cmd_check(config_path: &Path, json_mode: bool, verbose: bool) -> Result<(), SensorlogError> {
    let settings = Settings::load(config_path)?;

    if json_mode {
        let output = summary_json(config_path, &settings);
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("sensorlog Configuration");
    println!("=======================");
    println!("File:      {}", config_path.display());
    println!(
        "Logfile:   {}",
        settings
            .logfile
            .as_ref()
            .map_or_else(|| "(disabled)".to_string(), |p| p.display().to_string())
    );
    println!(
        "Homematic: {}",
        settings.homematic_url.as_deref().unwrap_or("(none)")
    );
    if let Some(mqtt) = &settings.mqtt {
        println!("MQTT:      {}:{} (qos {}, no transport)", mqtt.host, mqtt.port, mqtt.qos);
    }
    println!();

    println!("Sensors: {}", settings.sensors.len());
    for sensor in &settings.sensors {
        println!(
            "  {:<20} {:<12} rest {} ms{}{}",
            sensor.config.id,
            sensor.source.kind(),
            sensor.config.rest_period,
            if sensor.config.counter_mode { ", counter" } else { "" },
            if sensor.source.is_push_driven() {
                ", inert (no pub/sub transport)"
            } else {
                ""
            }
        );
        if verbose {
            println!("      source: {}", describe_source(&sensor.source));
        }
    }
    println!();

    println!("Logbooks: {}", settings.logbooks.len());
    for (i, book) in settings.logbooks.iter().enumerate() {
        println!(
            "  #{} {} every {} ms, {} entries, {} column(s)",
            i + 1,
            book.config
                .filename
                .as_ref()
                .map_or_else(|| "(no file)".to_string(), |p| p.display().to_string()),
            book.config.cycle_time,
            book.config.max_entries,
            book.columns.len()
        );
        if verbose {
            for column in &book.columns {
                println!(
                    "      {:<20} {:<14} {}",
                    column.sensor_id, column.operation.as_str(), column.title
                );
            }
        }
    }

    Ok(())
}

fn describe_source(source: &SourceSpec) -> String {
    match source {
        SourceSpec::JsonFile { location, keys } => format!("{} [{}]", location, keys.join(", ")),
        SourceSpec::Subscription { topic, keys } if keys.is_empty() => topic.clone(),
        SourceSpec::Subscription { topic, keys } => format!("{} [{}]", topic, keys.join(", ")),
        SourceSpec::Homematic { datapoint } => format!("datapoint {datapoint}"),
    }
}

fn summary_json(config_path: &Path, settings: &Settings) -> serde_json::Value {
    let sensors: Vec<serde_json::Value> = settings
        .sensors
        .iter()
        .map(|sensor| {
            serde_json::json!({
                "sensor_id": sensor.config.id,
                "source": sensor.source.kind(),
                "target": describe_source(&sensor.source),
                "rest_period_ms": sensor.config.rest_period,
                "counter": sensor.config.counter_mode,
                "inert": sensor.source.is_push_driven(),
                "factor": sensor.config.factor,
                "offset": sensor.config.offset
            })
        })
        .collect();

    let logbooks: Vec<serde_json::Value> = settings
        .logbooks
        .iter()
        .map(|book| {
            let columns: Vec<serde_json::Value> = book
                .columns
                .iter()
                .map(|column| {
                    serde_json::json!({
                        "sensor_id": column.sensor_id,
                        "title": column.title,
                        "unit": column.unit,
                        "operation": column.operation,
                        "evaluation_period_ms": column.evaluation_period
                    })
                })
                .collect();
            serde_json::json!({
                "filename": book.config.filename.as_ref().map(|p| p.display().to_string()),
                "cycle_time_ms": book.config.cycle_time,
                "max_entries": book.config.max_entries,
                "missing_data": book.config.missing_data,
                "columns": columns
            })
        })
        .collect();

    serde_json::json!({
        "config": config_path.display().to_string(),
        "logfile": settings.logfile.as_ref().map(|p| p.display().to_string()),
        "homematic": settings.homematic_url,
        "mqtt": settings.mqtt.as_ref().map(|m| serde_json::json!({
            "host": m.host,
            "port": m.port,
            "qos": m.qos,
            "retained": m.retained
        })),
        "sensors": sensors,
        "logbooks": logbooks
    })
}

// =============================================================================
// PRINT COMMAND
// =============================================================================

/// Print the configuration as the document printer renders it.
pub fn cmd_print(config_path: &Path) -> Result<(), SensorlogError> {
    let root = config::read_document(config_path)?;
    println!("{}", root.print(0));
    Ok(())
}
