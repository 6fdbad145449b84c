//! # Column Module
//!
//! One logbook column: a sensor, an operation and an evaluation window.
//!
//! Value operations read the sensor's confidence-filtered history over
//! `(start, end]`. Counting operations read the pulse counter shared by all
//! columns of the same logbook and sensor.

use crate::logfile;
use crate::registry::Registry;
use crate::stats;
use crate::types::{CounterKey, LogbookId, SensorId, SensorlogError, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OPERATION
// =============================================================================

/// Statistic a column reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Mean,
    Median,
    Max,
    Min,
    Sum,
    Count,
    Freq,
    FreqMin,
    FreqMax,
    StddevMean,
    StddevMedian,
}

impl Operation {
    /// True for operations evaluated on the pulse counter.
    #[must_use]
    pub fn is_counting(self) -> bool {
        matches!(self, Self::Count | Self::Freq | Self::FreqMin | Self::FreqMax)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Max => "max",
            Self::Min => "min",
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Freq => "freq",
            Self::FreqMin => "freq_min",
            Self::FreqMax => "freq_max",
            Self::StddevMean => "stddev_mean",
            Self::StddevMedian => "stddev_median",
        }
    }
}

impl FromStr for Operation {
    type Err = SensorlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "sum" => Ok(Self::Sum),
            "count" => Ok(Self::Count),
            "freq" => Ok(Self::Freq),
            "freq_min" => Ok(Self::FreqMin),
            "freq_max" => Ok(Self::FreqMax),
            "stddev" | "stddev_mean" => Ok(Self::StddevMean),
            "stddev_median" => Ok(Self::StddevMedian),
            other => Err(SensorlogError::Config(format!("Unknown operation: {other}"))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// COLUMN
// =============================================================================

/// Settings of a column, as read from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    pub sensor: SensorId,
    pub title: String,
    pub unit: String,
    pub operation: Operation,
    /// Window length in ms; 0 means one logbook cycle.
    pub evaluation_period: u64,
    pub confidence_absolute: f64,
    pub confidence_sigma: f64,
    pub count_factor: f64,
    pub publish_topic: Option<String>,
    pub publish_state: Option<String>,
}

impl ColumnConfig {
    #[must_use]
    pub fn new(sensor: SensorId, operation: Operation) -> Self {
        Self {
            sensor,
            title: String::new(),
            unit: String::new(),
            operation,
            evaluation_period: 0,
            confidence_absolute: 0.0,
            confidence_sigma: 0.0,
            count_factor: 1.0,
            publish_topic: None,
            publish_state: None,
        }
    }
}

/// A configured column bound to its sensor and counter.
#[derive(Debug, Clone)]
pub struct Column {
    config: ColumnConfig,
    evaluation_period: u64,
    n_cycles: usize,
    counter: CounterKey,
}

impl Column {
    /// Bind a column of `logbook` to its sensor and shared counter.
    ///
    /// Raises the sensor's retention to the evaluation period and the
    /// counter's retention to the number of cycles the window spans.
    pub fn new(
        config: ColumnConfig,
        logbook: LogbookId,
        cycle_time: u64,
        registry: &mut Registry,
        now: Timestamp,
    ) -> Result<Self, SensorlogError> {
        let evaluation_period = if config.evaluation_period == 0 {
            cycle_time
        } else {
            config.evaluation_period
        };

        registry
            .sensor_mut(config.sensor)
            .ok_or_else(|| SensorlogError::UnknownSensor(format!("#{}", config.sensor.0)))?
            .accumulate_keep_time(evaluation_period);

        let counter = CounterKey::new(logbook, config.sensor);
        registry.counter_for(counter, now);

        let mut column = Self {
            config,
            evaluation_period,
            n_cycles: 1,
            counter,
        };
        column.recalculate_cycles(cycle_time, registry);
        Ok(column)
    }

    /// Recompute the cycle count after a cycle-time change.
    pub fn recalculate_cycles(&mut self, cycle_time: u64, registry: &mut Registry) {
        self.n_cycles = (self.evaluation_period / cycle_time.max(1)) as usize;
        if let Some(counter) = registry.counter_mut(self.counter) {
            counter.accumulate_cycles_to_store(self.n_cycles);
        }
    }

    #[must_use]
    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.config.title
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.config.unit
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.config.operation
    }

    #[must_use]
    pub fn evaluation_period(&self) -> u64 {
        self.evaluation_period
    }

    #[must_use]
    pub fn n_cycles(&self) -> usize {
        self.n_cycles
    }

    #[must_use]
    pub fn counter_key(&self) -> CounterKey {
        self.counter
    }

    /// Column value over `(start, end]`, formatted for the log file.
    pub fn evaluate(
        &self,
        registry: &Registry,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<String, SensorlogError> {
        let value = self.evaluate_value(registry, start, end)?;
        Ok(logfile::format_value(value))
    }

    fn evaluate_value(
        &self,
        registry: &Registry,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<f64, SensorlogError> {
        let op = self.config.operation;

        if op.is_counting() {
            let counter = registry
                .counter(self.counter)
                .ok_or(SensorlogError::NoData)?;
            let aggregate = counter.aggregate(self.n_cycles, end);
            let raw = match op {
                Operation::Count => aggregate.count as f64,
                Operation::Freq => aggregate.frequency,
                Operation::FreqMin => aggregate.frequency_min,
                _ => aggregate.frequency_max,
            };
            return Ok(self.config.count_factor * raw);
        }

        let sensor = registry
            .sensor(self.config.sensor)
            .ok_or_else(|| SensorlogError::UnknownSensor(format!("#{}", self.config.sensor.0)))?;
        let values = sensor.store().windowed_values_between(
            start,
            end,
            self.config.confidence_absolute,
            self.config.confidence_sigma,
        );

        match op {
            Operation::Mean => stats::mean(&values),
            Operation::Median => stats::median(&values),
            Operation::Max => stats::maximum(&values),
            Operation::Min => stats::minimum(&values),
            Operation::Sum => Ok(stats::sum(&values)),
            Operation::StddevMean => Ok(stats::stddev_mean(&values)),
            _ => Ok(stats::stddev_median(&values)),
        }
    }

    /// Rotate the shared counter at `slot`.
    pub fn start_new_cycle(&self, registry: &mut Registry, slot: Timestamp) {
        if let Some(counter) = registry.counter_mut(self.counter) {
            counter.start_new_cycle(slot);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{DataSource, Sensor, SensorConfig};

    struct Silent;

    impl DataSource for Silent {
        fn kind(&self) -> &'static str {
            "silent"
        }

        fn sample(&mut self, _now: Timestamp) -> Result<Option<f64>, SensorlogError> {
            Ok(None)
        }
    }

    fn registry_with_values(values: &[(Timestamp, f64)]) -> (Registry, SensorId) {
        let mut registry = Registry::new();
        let mut config = SensorConfig::new("t");
        config.rest_period = 1_000;
        let id = registry
            .add_sensor(Sensor::new(config, Box::new(Silent)))
            .expect("add");
        let sensor = registry.sensor_mut(id).expect("sensor");
        for (ts, v) in values {
            sensor.push(*v, *ts);
        }
        (registry, id)
    }

    #[test]
    fn operation_names_round_trip() {
        for name in [
            "mean", "median", "max", "min", "sum", "count", "freq", "freq_min", "freq_max",
            "stddev_mean", "stddev_median",
        ] {
            let op: Operation = name.parse().expect("known");
            assert_eq!(op.as_str(), name);
        }
        assert_eq!("stddev".parse::<Operation>().expect("alias"), Operation::StddevMean);
        assert!("average".parse::<Operation>().is_err());
    }

    #[test]
    fn zero_period_means_one_cycle() {
        let (mut registry, id) = registry_with_values(&[]);
        let column = Column::new(
            ColumnConfig::new(id, Operation::Mean),
            LogbookId(0),
            60_000,
            &mut registry,
            0,
        )
        .expect("column");
        assert_eq!(column.evaluation_period(), 60_000);
        assert_eq!(column.n_cycles(), 1);
        assert_eq!(registry.sensor(id).expect("sensor").admission().keep_for(), 60_000);
    }

    #[test]
    fn unknown_sensor_is_rejected() {
        let mut registry = Registry::new();
        let result = Column::new(
            ColumnConfig::new(SensorId(3), Operation::Mean),
            LogbookId(0),
            60_000,
            &mut registry,
            0,
        );
        assert!(matches!(result, Err(SensorlogError::UnknownSensor(_))));
    }

    #[test]
    fn window_is_open_at_start_closed_at_end() {
        let (mut registry, id) =
            registry_with_values(&[(1_000, 1.0), (2_000, 2.0), (3_000, 3.0), (4_000, 4.0)]);
        let column = Column::new(
            ColumnConfig::new(id, Operation::Sum),
            LogbookId(0),
            2_000,
            &mut registry,
            0,
        )
        .expect("column");
        assert_eq!(column.evaluate(&registry, 1_000, 3_000).expect("sum"), "5");
    }

    #[test]
    fn empty_window_fails_except_for_sum() {
        let (mut registry, id) = registry_with_values(&[]);
        let mean = Column::new(
            ColumnConfig::new(id, Operation::Mean),
            LogbookId(0),
            1_000,
            &mut registry,
            0,
        )
        .expect("column");
        let sum = Column::new(
            ColumnConfig::new(id, Operation::Sum),
            LogbookId(0),
            1_000,
            &mut registry,
            0,
        )
        .expect("column");
        assert!(matches!(
            mean.evaluate(&registry, 0, 1_000),
            Err(SensorlogError::NoData)
        ));
        assert_eq!(sum.evaluate(&registry, 0, 1_000).expect("sum"), "0");
    }

    #[test]
    fn count_is_scaled_by_factor() {
        let (mut registry, id) = registry_with_values(&[]);
        let mut config = ColumnConfig::new(id, Operation::Count);
        config.count_factor = 0.5;
        let column =
            Column::new(config, LogbookId(0), 10_000, &mut registry, 0).expect("column");

        let counter = registry.counter_for(column.counter_key(), 0);
        for ts in [1_000, 2_000, 3_000] {
            counter.record_event(ts);
        }
        assert_eq!(column.evaluate(&registry, 0, 10_000).expect("count"), "1.5");
    }

    #[test]
    fn values_are_rounded_to_six_digits() {
        let (mut registry, id) =
            registry_with_values(&[(1_000, 10.0), (2_000, 12.0), (3_000, 12.0)]);
        let column = Column::new(
            ColumnConfig::new(id, Operation::Mean),
            LogbookId(0),
            3_000,
            &mut registry,
            0,
        )
        .expect("column");
        assert_eq!(column.evaluate(&registry, 0, 3_000).expect("mean"), "11.3333");
    }

    #[test]
    fn columns_of_one_logbook_share_a_counter() {
        let (mut registry, id) = registry_with_values(&[]);
        let quarter = Column::new(
            ColumnConfig::new(id, Operation::Count),
            LogbookId(0),
            900_000,
            &mut registry,
            0,
        )
        .expect("column");
        let mut hourly = ColumnConfig::new(id, Operation::Count);
        hourly.evaluation_period = 3_600_000;
        let hour = Column::new(hourly, LogbookId(0), 900_000, &mut registry, 0).expect("column");

        assert_eq!(quarter.counter_key(), hour.counter_key());
        assert_eq!(hour.n_cycles(), 4);
        assert_eq!(
            registry
                .counter(hour.counter_key())
                .expect("counter")
                .cycles_to_store(),
            4
        );
        assert_eq!(registry.counter_count(), 1);
    }

    #[test]
    fn recalculation_follows_cycle_time() {
        let (mut registry, id) = registry_with_values(&[]);
        let mut config = ColumnConfig::new(id, Operation::Freq);
        config.evaluation_period = 600_000;
        let mut column =
            Column::new(config, LogbookId(0), 300_000, &mut registry, 0).expect("column");
        assert_eq!(column.n_cycles(), 2);
        column.recalculate_cycles(60_000, &mut registry);
        assert_eq!(column.n_cycles(), 10);
        assert_eq!(
            registry
                .counter(column.counter_key())
                .expect("counter")
                .cycles_to_store(),
            10
        );
    }
}
