//! # Registry
//!
//! Arena owning every sensor and every pulse counter.
//!
//! Sensors are addressed by `SensorId`, counters by `CounterKey`. A counter
//! is created on first request for its key and then shared by every column
//! asking for the same key.

use crate::counter::Counter;
use crate::publish::Context;
use crate::sensor::Sensor;
use crate::types::{CounterKey, SensorId, SensorlogError, Timestamp};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Registry {
    sensors: Vec<Sensor>,
    counters: BTreeMap<CounterKey, Counter>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sensor. Sensor names must be unique.
    pub fn add_sensor(&mut self, sensor: Sensor) -> Result<SensorId, SensorlogError> {
        if self.sensor_by_name(sensor.id()).is_some() {
            return Err(SensorlogError::Config(format!(
                "Duplicate sensor_id: {}",
                sensor.id()
            )));
        }
        self.sensors.push(sensor);
        Ok(SensorId(self.sensors.len() - 1))
    }

    #[must_use]
    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(id.0)
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Option<&mut Sensor> {
        self.sensors.get_mut(id.0)
    }

    #[must_use]
    pub fn sensor_by_name(&self, name: &str) -> Option<SensorId> {
        self.sensors
            .iter()
            .position(|s| s.id() == name)
            .map(SensorId)
    }

    pub fn sensors(&self) -> impl Iterator<Item = (SensorId, &Sensor)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, s)| (SensorId(i), s))
    }

    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Counter for `key`, created with its first cycle at `now` if absent.
    pub fn counter_for(&mut self, key: CounterKey, now: Timestamp) -> &mut Counter {
        self.counters
            .entry(key)
            .or_insert_with(|| Counter::new(now))
    }

    #[must_use]
    pub fn counter(&self, key: CounterKey) -> Option<&Counter> {
        self.counters.get(&key)
    }

    pub fn counter_mut(&mut self, key: CounterKey) -> Option<&mut Counter> {
        self.counters.get_mut(&key)
    }

    #[must_use]
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    /// Count one event at `slot` on every counter bound to `sensor`.
    fn count_event(&mut self, sensor: SensorId, slot: Timestamp) {
        for (_, counter) in self
            .counters
            .iter_mut()
            .filter(|(key, _)| key.sensor == sensor)
        {
            counter.record_event(slot);
        }
    }

    /// Poll every sensor once and publish newly admitted values.
    ///
    /// A failing sensor is logged and skipped.
    pub fn measure_all(&mut self, ctx: &Context<'_>) {
        let now = ctx.clock.now();

        for index in 0..self.sensors.len() {
            let id = SensorId(index);
            let sensor = &mut self.sensors[index];

            match sensor.measure(now) {
                Ok(Some(slot)) => {
                    sensor.publish_last(ctx);
                    self.count_event(id, slot);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(sensor = sensor.id(), error = %e, "read failed");
                    ctx.sink
                        .record(&format!("Error reading sensor {}: {e}", sensor.id()), true);
                }
            }
        }
    }

    /// Feed a value to a push-driven sensor.
    ///
    /// Returns whether the value was admitted.
    pub fn push(
        &mut self,
        id: SensorId,
        raw: f64,
        ctx: &Context<'_>,
    ) -> Result<bool, SensorlogError> {
        let now = ctx.clock.now();
        let sensor = self
            .sensors
            .get_mut(id.0)
            .ok_or_else(|| SensorlogError::UnknownSensor(format!("#{}", id.0)))?;

        match sensor.push(raw, now) {
            Some(slot) => {
                sensor.publish_last(ctx);
                self.count_event(id, slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::publish::{PublishSink, Sink};
    use crate::sensor::{DataSource, SensorConfig};
    use crate::types::LogbookId;
    use std::sync::Mutex;

    struct Constant(f64);

    impl DataSource for Constant {
        fn kind(&self) -> &'static str {
            "constant"
        }

        fn sample(&mut self, _now: Timestamp) -> Result<Option<f64>, SensorlogError> {
            Ok(Some(self.0))
        }
    }

    struct Broken;

    impl DataSource for Broken {
        fn kind(&self) -> &'static str {
            "broken"
        }

        fn sample(&mut self, _now: Timestamp) -> Result<Option<f64>, SensorlogError> {
            Err(SensorlogError::SourceRead("gone".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<(String, String)>>,
        messages: Mutex<Vec<String>>,
    }

    impl PublishSink for Recorder {
        fn publish(&self, topic: &str, payload: &str) -> Result<(), SensorlogError> {
            self.published
                .lock()
                .expect("lock")
                .push((topic.to_string(), payload.to_string()));
            Ok(())
        }

        fn publish_state(&self, _id: &str, _payload: &str) -> Result<(), SensorlogError> {
            Err(SensorlogError::Publish("unreachable".into()))
        }
    }

    impl Sink for Recorder {
        fn record(&self, message: &str, _is_error: bool) {
            self.messages.lock().expect("lock").push(message.to_string());
        }
    }

    fn config(name: &str) -> SensorConfig {
        let mut c = SensorConfig::new(name);
        c.rest_period = 1_000;
        c
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = Registry::new();
        registry
            .add_sensor(Sensor::new(config("a"), Box::new(Constant(1.0))))
            .expect("first");
        let err = registry.add_sensor(Sensor::new(config("a"), Box::new(Constant(1.0))));
        assert!(matches!(err, Err(SensorlogError::Config(_))));
        assert_eq!(registry.sensor_by_name("a"), Some(SensorId(0)));
    }

    #[test]
    fn counters_are_shared_per_key() {
        let mut registry = Registry::new();
        let key = CounterKey::new(LogbookId(0), SensorId(0));
        registry.counter_for(key, 0).accumulate_cycles_to_store(4);
        assert_eq!(registry.counter_for(key, 999).cycles_to_store(), 4);
        assert_eq!(registry.counter_count(), 1);
    }

    #[test]
    fn measure_counts_events_on_all_bound_counters() {
        let mut registry = Registry::new();
        let id = registry
            .add_sensor(Sensor::new(config("a"), Box::new(Constant(2.0))))
            .expect("add");
        let k0 = CounterKey::new(LogbookId(0), id);
        let k1 = CounterKey::new(LogbookId(1), id);
        registry.counter_for(k0, 0);
        registry.counter_for(k1, 0);

        let clock = ManualClock::new(1_000);
        let recorder = Recorder::default();
        let ctx = Context::new(&clock, &recorder, &recorder);

        registry.measure_all(&ctx);
        clock.advance(500);
        registry.measure_all(&ctx);
        clock.advance(500);
        registry.measure_all(&ctx);

        for key in [k0, k1] {
            assert_eq!(registry.counter(key).expect("counter").aggregate(1, 2_000).count, 2);
        }
    }

    #[test]
    fn new_values_are_published_once() {
        let mut registry = Registry::new();
        let mut c = config("a");
        c.publish_topic = Some("home/a".into());
        c.publish_state = Some("1234".into());
        registry
            .add_sensor(Sensor::new(c, Box::new(Constant(21.5))))
            .expect("add");

        let clock = ManualClock::new(1_000);
        let recorder = Recorder::default();
        let ctx = Context::new(&clock, &recorder, &recorder);

        registry.measure_all(&ctx);
        registry.measure_all(&ctx);

        let published = recorder.published.lock().expect("lock");
        assert_eq!(published.as_slice(), &[("home/a".to_string(), "21.5".to_string())]);
        let messages = recorder.messages.lock().expect("lock");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("1234"));
    }

    #[test]
    fn failing_sensor_does_not_stop_siblings() {
        let mut registry = Registry::new();
        registry
            .add_sensor(Sensor::new(config("bad"), Box::new(Broken)))
            .expect("add");
        let good = registry
            .add_sensor(Sensor::new(config("good"), Box::new(Constant(1.0))))
            .expect("add");

        let clock = ManualClock::new(1_000);
        let recorder = Recorder::default();
        let ctx = Context::new(&clock, &recorder, &recorder);
        registry.measure_all(&ctx);

        assert_eq!(registry.sensor(good).expect("good").store().len(), 1);
        assert_eq!(
            registry
                .sensor(SensorId(0))
                .expect("bad")
                .admission()
                .read_failures(),
            1
        );
        assert_eq!(recorder.messages.lock().expect("lock").len(), 1);
    }

    #[test]
    fn push_reaches_sensor_and_counters() {
        let mut registry = Registry::new();
        let id = registry
            .add_sensor(Sensor::new(config("p"), Box::new(Constant(0.0))))
            .expect("add");
        let key = CounterKey::new(LogbookId(0), id);
        registry.counter_for(key, 0);

        let clock = ManualClock::new(3_000);
        let recorder = Recorder::default();
        let ctx = Context::new(&clock, &recorder, &recorder);

        assert!(registry.push(id, 7.0, &ctx).expect("push"));
        assert!(!registry.push(id, 8.0, &ctx).expect("gated"));
        assert_eq!(registry.counter(key).expect("counter").aggregate(1, 3_000).count, 1);
        assert!(registry.push(SensorId(9), 1.0, &ctx).is_err());
    }
}
