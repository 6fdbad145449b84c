//! # Collector
//!
//! Owns the registry and the logbooks and drives them from a single tick.

use crate::column::ColumnConfig;
use crate::logbook::{LogRow, Logbook, LogbookConfig};
use crate::publish::Context;
use crate::registry::Registry;
use crate::sensor::Sensor;
use crate::types::{LogbookId, SensorId, SensorlogError, Timestamp};

#[derive(Debug, Default)]
pub struct Collector {
    registry: Registry,
    logbooks: Vec<Logbook>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    #[must_use]
    pub fn logbooks(&self) -> &[Logbook] {
        &self.logbooks
    }

    pub fn add_sensor(&mut self, sensor: Sensor) -> Result<SensorId, SensorlogError> {
        self.registry.add_sensor(sensor)
    }

    pub fn add_logbook(&mut self, config: LogbookConfig, now: Timestamp) -> LogbookId {
        let id = LogbookId(self.logbooks.len());
        self.logbooks.push(Logbook::new(id, config, now));
        id
    }

    pub fn add_column(
        &mut self,
        logbook: LogbookId,
        config: ColumnConfig,
        now: Timestamp,
    ) -> Result<(), SensorlogError> {
        let book = self
            .logbooks
            .get_mut(logbook.0)
            .ok_or(SensorlogError::UnknownLogbook(logbook))?;
        book.add_column(&mut self.registry, config, now)?;
        Ok(())
    }

    /// Feed a value to a push-driven sensor.
    pub fn push(
        &mut self,
        sensor: SensorId,
        raw: f64,
        ctx: &Context<'_>,
    ) -> Result<bool, SensorlogError> {
        self.registry.push(sensor, raw, ctx)
    }

    /// Refresh every sensor, then let every logbook write if due.
    ///
    /// Returns the rows written in this tick.
    pub fn tick(&mut self, ctx: &Context<'_>) -> Vec<(LogbookId, LogRow)> {
        self.registry.measure_all(ctx);

        let mut rows = Vec::new();
        for book in &mut self.logbooks {
            if let Some(row) = book.write(&mut self.registry, ctx) {
                tracing::debug!(logbook = book.id().0, slot = row.slot, "row written");
                rows.push((book.id(), row));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::column::Operation;
    use crate::publish::{PublishSink, TracingSink};
    use crate::sensor::{DataSource, SensorConfig};

    struct Ramp(f64);

    impl DataSource for Ramp {
        fn kind(&self) -> &'static str {
            "ramp"
        }

        fn sample(&mut self, _now: Timestamp) -> Result<Option<f64>, SensorlogError> {
            self.0 += 1.0;
            Ok(Some(self.0))
        }
    }

    struct Nowhere;

    impl PublishSink for Nowhere {
        fn publish(&self, _topic: &str, _payload: &str) -> Result<(), SensorlogError> {
            Ok(())
        }

        fn publish_state(&self, _id: &str, _payload: &str) -> Result<(), SensorlogError> {
            Ok(())
        }
    }

    #[test]
    fn unknown_logbook_is_an_error() {
        let mut collector = Collector::new();
        let result = collector.add_column(
            LogbookId(2),
            ColumnConfig::new(SensorId(0), Operation::Mean),
            0,
        );
        assert!(matches!(result, Err(SensorlogError::UnknownLogbook(LogbookId(2)))));
    }

    #[test]
    fn tick_measures_then_writes() {
        let mut collector = Collector::new();
        let mut config = SensorConfig::new("ramp");
        config.rest_period = 1_000;
        let id = collector
            .add_sensor(Sensor::new(config, Box::new(Ramp(0.0))))
            .expect("sensor");
        let book = collector.add_logbook(
            LogbookConfig {
                cycle_time: 5_000,
                ..LogbookConfig::default()
            },
            0,
        );
        collector
            .add_column(book, ColumnConfig::new(id, Operation::Max), 0)
            .expect("max");
        collector
            .add_column(book, ColumnConfig::new(id, Operation::Count), 0)
            .expect("count");

        let clock = ManualClock::new(1_000);
        let sink = TracingSink::new();
        let ctx = Context::new(&clock, &Nowhere, &sink);

        let mut rows = Vec::new();
        for _ in 0..5 {
            rows.extend(collector.tick(&ctx));
            clock.advance(1_000);
        }

        // samples 1..=5 at 1000..=5000; the window (0, 5000] holds all five
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.values, vec!["5".to_string(), "5".to_string()]);
    }
}
