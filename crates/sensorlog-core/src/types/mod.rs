//! # Core Type Definitions
//!
//! Shared identifiers and the error type of the sensorlog engine:
//! - Arena identifiers (`SensorId`, `LogbookId`, `CounterKey`)
//! - Millisecond timestamps (`Timestamp`)
//! - Error types (`SensorlogError`)
//!
//! ## Ownership
//!
//! Sensors and counters live in the `Registry` arena. Everything else refers
//! to them by these small copyable keys, never by pointer.

use crate::json::JsonError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// TIME
// =============================================================================

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Absolute distance between two timestamps.
#[must_use]
pub const fn time_diff(a: Timestamp, b: Timestamp) -> u64 {
    a.abs_diff(b)
}

// =============================================================================
// ARENA IDENTIFIERS
// =============================================================================

/// Index of a sensor inside the `Registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorId(pub usize);

/// Index of a logbook inside the `Collector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogbookId(pub usize);

/// Stable key of a shared pulse counter.
///
/// Columns of one logbook that read the same sensor share one counter.
/// Columns of different logbooks never do, since their cycle times differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub logbook: LogbookId,
    pub sensor: SensorId,
}

impl CounterKey {
    #[must_use]
    pub const fn new(logbook: LogbookId, sensor: SensorId) -> Self {
        Self { logbook, sensor }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the sensorlog engine.
///
/// - Per-item failures are caught at the item's loop boundary
/// - Use `Result<T, SensorlogError>` for fallible operations
/// - The engine never panics; a failing item is skipped or written as missing
#[derive(Debug, Error)]
pub enum SensorlogError {
    /// A configuration field is malformed or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or navigated.
    #[error("Parse error: {0}")]
    Parse(#[from] JsonError),

    /// A statistic was requested over an empty value set.
    #[error("No data available")]
    NoData,

    /// A data source failed to deliver a value.
    #[error("Source read error: {0}")]
    SourceRead(String),

    /// A publish target could not be reached.
    #[error("Publish error: {0}")]
    Publish(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// The referenced sensor does not exist.
    #[error("Sensor not found: {0}")]
    UnknownSensor(String),

    /// The referenced logbook does not exist.
    #[error("Logbook not found: {0:?}")]
    UnknownLogbook(LogbookId),
}

impl From<std::io::Error> for SensorlogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
