//! # Runtime
//!
//! Turns [`Settings`] into a running collector: concrete data sources,
//! the publish dispatcher and the pub/sub ingress table. The tick loop
//! runs here on a blocking thread.

use crate::config::{Settings, SourceSpec};
use crate::homematic::HomematicClient;
use crate::publish::Dispatcher;
use crate::sources::{self, HomematicSource, JsonSource, PushSource, ReadoutBuffer, SharedReadout};
use sensorlog_core::{
    Clock, Collector, Context, DataSource, Sensor, SensorId, SensorlogError, Sink, Timestamp,
    TracingSink,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A push-driven sensor waiting for payloads on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub keys: Vec<String>,
    pub sensor: SensorId,
}

/// Everything one collector process needs between ticks.
#[derive(Debug)]
pub struct Runtime {
    pub collector: Collector,
    pub dispatcher: Arc<Dispatcher>,
    pub subscriptions: Vec<Subscription>,
    readout: SharedReadout,
}

impl Runtime {
    /// Build sensors, logbooks and columns from `settings`.
    ///
    /// Items the engine rejects are logged and left out.
    pub fn from_settings(settings: &Settings, now: Timestamp) -> Result<Self, SensorlogError> {
        let readout = ReadoutBuffer::shared()?;
        let homematic = match &settings.homematic_url {
            Some(url) => Some(Arc::new(HomematicClient::new(url.as_str())?)),
            None => None,
        };

        let mut collector = Collector::new();
        let mut subscriptions = Vec::new();

        for spec in &settings.sensors {
            let source: Box<dyn DataSource> = match &spec.source {
                SourceSpec::JsonFile { location, keys } => Box::new(JsonSource::new(
                    location.as_str(),
                    keys.clone(),
                    Arc::clone(&readout),
                )),
                SourceSpec::Homematic { datapoint } => match &homematic {
                    Some(client) => {
                        Box::new(HomematicSource::new(Arc::clone(client), datapoint.as_str()))
                    }
                    None => {
                        tracing::error!(sensor = %spec.config.id, "no state server configured");
                        continue;
                    }
                },
                SourceSpec::Subscription { .. } => Box::new(PushSource),
            };

            let id = match collector.add_sensor(Sensor::new(spec.config.clone(), source)) {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(sensor = %spec.config.id, error = %e, "sensor skipped");
                    continue;
                }
            };
            if let SourceSpec::Subscription { topic, keys } = &spec.source {
                tracing::warn!(
                    sensor = %spec.config.id,
                    topic = %topic,
                    "no pub/sub transport attached, sensor will not receive data"
                );
                subscriptions.push(Subscription {
                    topic: topic.clone(),
                    keys: keys.clone(),
                    sensor: id,
                });
            }
        }

        for (n, spec) in settings.logbooks.iter().enumerate() {
            let book = collector.add_logbook(spec.config.clone(), now);
            for column in &spec.columns {
                let Some(sensor) = collector.registry().sensor_by_name(&column.sensor_id) else {
                    tracing::error!(
                        "Logbook #{}: sensor '{}' not found.",
                        n + 1,
                        column.sensor_id
                    );
                    continue;
                };
                if let Err(e) = collector.add_column(book, column.to_config(sensor), now) {
                    tracing::error!("Logbook #{}: column skipped: {}", n + 1, e);
                }
            }
        }

        tracing::info!(
            sensors = collector.registry().sensor_count(),
            logbooks = collector.logbooks().len(),
            subscriptions = subscriptions.len(),
            "collector ready"
        );

        Ok(Self {
            collector,
            dispatcher: Arc::new(Dispatcher::new(homematic)),
            subscriptions,
            readout,
        })
    }

    /// One scheduler step: measure, write due logbooks, expire stale reads.
    pub fn tick(&mut self, ctx: &Context<'_>) -> usize {
        let rows = self.collector.tick(ctx).len();
        if let Ok(mut readout) = self.readout.lock() {
            readout.clean_up(ctx.clock.now());
        }
        rows
    }

    /// Feed a pub/sub payload to every sensor subscribed to `topic`.
    ///
    /// Returns how many sensors admitted a value.
    pub fn route(&mut self, topic: &str, payload: &str, ctx: &Context<'_>) -> usize {
        let mut admitted = 0;
        for subscription in self.subscriptions.iter().filter(|s| s.topic == topic) {
            let value = match sources::decode_payload(payload, &subscription.keys) {
                Ok(value) => value,
                Err(e) => {
                    ctx.sink.record(
                        &format!(
                            "Cannot decode payload on topic '{}': '{}' ({})",
                            topic, payload, e
                        ),
                        true,
                    );
                    continue;
                }
            };
            match self.collector.push(subscription.sensor, value, ctx) {
                Ok(true) => admitted += 1,
                Ok(false) => {}
                Err(e) => ctx.sink.record(&e.to_string(), true),
            }
        }
        admitted
    }
}

/// Drive `runtime` every `tick` until `stop` is set.
pub fn run_loop(
    runtime: &mut Runtime,
    clock: &dyn Clock,
    sink: &dyn Sink,
    tick: Duration,
    stop: &AtomicBool,
) {
    tracing::info!(tick_ms = tick.as_millis() as u64, "tick loop started");

    let dispatcher = Arc::clone(&runtime.dispatcher);
    while !stop.load(Ordering::Relaxed) {
        let ctx = Context::new(clock, dispatcher.as_ref(), sink);
        runtime.tick(&ctx);
        std::thread::sleep(tick);
    }

    tracing::info!("tick loop stopped");
}

/// Load `settings` into a runtime on the system clock and run it.
pub fn run(settings: &Settings, tick: Duration, stop: &AtomicBool) -> Result<(), SensorlogError> {
    let clock = sensorlog_core::SystemClock;
    let sink = TracingSink::new();
    let mut runtime = Runtime::from_settings(settings, clock.now())?;
    run_loop(&mut runtime, &clock, &sink, tick, stop);
    Ok(())
}
