//! # Engine Primitives
//!
//! Compiled-in defaults and hard limits of the sensorlog engine.
//! Configuration may override the defaults; the limits are fixed.

/// Hard cap on retained samples per measurement store.
///
/// The oldest sample is evicted first once the cap is exceeded.
pub const MAX_MEASUREMENTS: usize = 20_000;

/// Default logbook cycle time: 15 minutes.
pub const DEFAULT_CYCLE_TIME_MS: u64 = 900_000;

/// Default number of data rows a logbook file retains.
pub const DEFAULT_MAX_ENTRIES: usize = 30;

/// Default minimum rest period between two measurements of one sensor: 60 s.
pub const DEFAULT_REST_PERIOD_MS: u64 = 60_000;

/// Default placeholder written when a column has no value.
pub const DEFAULT_MISSING_DATA_TOKEN: &str = "-";

/// How long a fetched file or URL body is reused by other sensors.
pub const READOUT_BUFFER_MS: u64 = 800;

/// Characters allowed in a string that coerces to an integer.
pub const INT_CHARS: &str = "+-0123456789";

/// Characters allowed in a string that coerces to a float.
pub const FLOAT_CHARS: &str = "+-eE.0123456789";

/// Significant digits of a logged or published value.
pub const VALUE_SIGNIFICANT_DIGITS: usize = 6;

/// Label of the time column in a logbook header.
pub const TIME_COLUMN_LABEL: &str = "Time             ";
