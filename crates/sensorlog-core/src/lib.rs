//! # sensorlog-core
//!
//! The measurement-and-aggregation engine of sensorlog.
//!
//! Sensors feed bounded, time-ordered histories and pulse counters. Logbooks
//! evaluate their columns over those histories once per cycle and write one
//! row per cycle boundary.
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no network access; adapters live in the application
//! - One caller drives everything through `Collector::tick`
//! - Clock, data sources, publish targets and the message sink are injected
//! - A failing sensor, column or logbook never stops its siblings

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod collector;
pub mod column;
pub mod counter;
pub mod json;
pub mod logbook;
pub mod logfile;
pub mod measurements;
pub mod primitives;
pub mod publish;
pub mod registry;
pub mod sensor;
pub mod stats;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{CounterKey, LogbookId, SensorId, SensorlogError, Timestamp, time_diff};

// =============================================================================
// RE-EXPORTS: JSON Document Model
// =============================================================================

pub use json::{JsonError, JsonNode, JsonValue};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::Collector;
pub use column::{Column, ColumnConfig, Operation};
pub use counter::{Counter, CounterAggregate, CycleCounter};
pub use logbook::{LogRow, Logbook, LogbookConfig};
pub use measurements::{MeasurementStore, Sample};
pub use publish::{Context, PublishSink, Sink, TracingSink};
pub use registry::Registry;
pub use sensor::{Admission, DataSource, Sensor, SensorConfig};
