//! # Sensor Module
//!
//! A sensor pairs one `DataSource` with the bookkeeping every source shares:
//! - `Admission`: rest-period gating, value transform, read-failure counting
//!   and the retention horizon
//! - `MeasurementStore`: the admitted history
//! - Optional targets that receive every newly admitted value once
//!
//! Sources come in two flavours. Polled sources return a value from
//! `sample`. Push-driven sources return `None` and receive values through
//! `Sensor::push`.

use crate::logfile;
use crate::measurements::MeasurementStore;
use crate::primitives::DEFAULT_REST_PERIOD_MS;
use crate::publish::Context;
use crate::types::{SensorlogError, Timestamp, time_diff};

// =============================================================================
// DATA SOURCE
// =============================================================================

/// Capability of producing raw values.
pub trait DataSource: Send {
    /// Short name of the source kind, for diagnostics.
    fn kind(&self) -> &'static str;

    /// Read one raw value. `Ok(None)` means the source does not poll.
    fn sample(&mut self, now: Timestamp) -> Result<Option<f64>, SensorlogError>;
}

// =============================================================================
// ADMISSION
// =============================================================================

/// Per-sensor admission state.
#[derive(Debug, Clone)]
pub struct Admission {
    rest_period: u64,
    factor: f64,
    offset: f64,
    counter_mode: bool,
    read_failures: u64,
    last_measurement: Option<Timestamp>,
    keep_for: u64,
}

impl Default for Admission {
    fn default() -> Self {
        Self {
            rest_period: DEFAULT_REST_PERIOD_MS,
            factor: 1.0,
            offset: 0.0,
            counter_mode: false,
            read_failures: 0,
            last_measurement: None,
            keep_for: 0,
        }
    }
}

impl Admission {
    #[must_use]
    pub fn new(rest_period: u64, factor: f64, offset: f64, counter_mode: bool) -> Self {
        Self {
            rest_period,
            factor,
            offset,
            counter_mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rest_period(&self) -> u64 {
        self.rest_period
    }

    #[must_use]
    pub fn counter_mode(&self) -> bool {
        self.counter_mode
    }

    #[must_use]
    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    #[must_use]
    pub fn keep_for(&self) -> u64 {
        self.keep_for
    }

    /// True once the rest period has passed since the last measurement.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.last_measurement
            .is_none_or(|last| time_diff(now, last) >= self.rest_period)
    }

    /// `now` rounded down to a multiple of the rest period.
    #[must_use]
    pub fn timeslot(&self, now: Timestamp) -> Timestamp {
        if self.rest_period == 0 {
            now
        } else {
            now - now % self.rest_period
        }
    }

    /// `factor * (raw + offset)`.
    #[must_use]
    pub fn transform(&self, raw: f64) -> f64 {
        self.factor * (raw + self.offset)
    }

    /// Oldest timestamp still needed at `now`.
    #[must_use]
    pub fn horizon(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.keep_for)
    }

    /// Keep history for at least `ms`.
    pub fn accumulate_keep_time(&mut self, ms: u64) {
        self.keep_for = self.keep_for.max(ms);
    }

    /// Count a failed read, at most once per rest period.
    pub fn record_failure(&mut self, now: Timestamp) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.read_failures += 1;
        self.last_measurement = Some(now);
        true
    }

    fn mark_admitted(&mut self, slot: Timestamp) {
        self.read_failures = 0;
        self.last_measurement = Some(slot);
    }
}

// =============================================================================
// SENSOR
// =============================================================================

/// Static settings of a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub id: String,
    pub rest_period: u64,
    pub factor: f64,
    pub offset: f64,
    pub counter_mode: bool,
    pub publish_topic: Option<String>,
    pub publish_state: Option<String>,
}

impl SensorConfig {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rest_period: DEFAULT_REST_PERIOD_MS,
            factor: 1.0,
            offset: 0.0,
            counter_mode: false,
            publish_topic: None,
            publish_state: None,
        }
    }
}

/// A data source with its history.
pub struct Sensor {
    id: String,
    admission: Admission,
    store: MeasurementStore,
    source: Box<dyn DataSource>,
    publish_topic: Option<String>,
    publish_state: Option<String>,
    last_published: bool,
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("id", &self.id)
            .field("source", &self.source.kind())
            .field("admission", &self.admission)
            .field("samples", &self.store.len())
            .finish()
    }
}

impl Sensor {
    #[must_use]
    pub fn new(config: SensorConfig, source: Box<dyn DataSource>) -> Self {
        Self {
            admission: Admission::new(
                config.rest_period,
                config.factor,
                config.offset,
                config.counter_mode,
            ),
            store: MeasurementStore::new(config.rest_period),
            id: config.id,
            source,
            publish_topic: config.publish_topic,
            publish_state: config.publish_state,
            last_published: true,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }

    #[must_use]
    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    #[must_use]
    pub fn store(&self) -> &MeasurementStore {
        &self.store
    }

    #[must_use]
    pub fn publish_topic(&self) -> Option<&str> {
        self.publish_topic.as_deref()
    }

    #[must_use]
    pub fn publish_state(&self) -> Option<&str> {
        self.publish_state.as_deref()
    }

    pub fn accumulate_keep_time(&mut self, ms: u64) {
        self.admission.accumulate_keep_time(ms);
    }

    /// Poll the source if the rest period allows it.
    ///
    /// Returns the timeslot of a newly admitted sample.
    pub fn measure(&mut self, now: Timestamp) -> Result<Option<Timestamp>, SensorlogError> {
        if !self.admission.is_due(now) {
            return Ok(None);
        }

        self.store.evict_before(self.admission.horizon(now));

        match self.source.sample(now) {
            Ok(Some(raw)) => Ok(self.push(raw, now)),
            Ok(None) => Ok(None),
            Err(e) => {
                self.admission.record_failure(now);
                Err(e)
            }
        }
    }

    /// Admit a raw value at `now`, if the rest period allows it.
    ///
    /// Returns the timeslot the value was stored at.
    pub fn push(&mut self, raw: f64, now: Timestamp) -> Option<Timestamp> {
        if !self.admission.is_due(now) {
            return None;
        }

        let slot = self.admission.timeslot(now);
        self.admission.mark_admitted(slot);
        self.store.evict_before(self.admission.horizon(slot));

        let value = self.admission.transform(raw);
        if self.admission.counter_mode() {
            self.store.set_only_value(value, slot);
        } else {
            self.store.admit(value, slot);
        }

        self.last_published = false;
        Some(slot)
    }

    /// Publish the latest value once per admitted sample.
    pub fn publish_last(&mut self, ctx: &Context<'_>) {
        if self.last_published {
            return;
        }
        self.last_published = true;

        let Ok(value) = self.store.last_value() else {
            return;
        };
        ctx.publish_to(
            self.publish_topic.as_deref(),
            self.publish_state.as_deref(),
            &logfile::format_value(value),
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
