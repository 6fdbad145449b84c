//! # Publish Dispatch
//!
//! Routes engine publications to their targets. Remote state writes go to
//! the Homematic client when one is configured. This build carries no
//! broker transport, so topic publications are written to the log.

use crate::homematic::HomematicClient;
use sensorlog_core::{PublishSink, SensorlogError};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Dispatcher {
    homematic: Option<Arc<HomematicClient>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(homematic: Option<Arc<HomematicClient>>) -> Self {
        Self { homematic }
    }

    #[must_use]
    pub fn has_state_server(&self) -> bool {
        self.homematic.is_some()
    }
}

impl PublishSink for Dispatcher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), SensorlogError> {
        tracing::info!(target: "sensorlog::publish", topic, payload, "publish");
        Ok(())
    }

    fn publish_state(&self, id: &str, payload: &str) -> Result<(), SensorlogError> {
        match &self.homematic {
            Some(client) => client.set_state(id, payload),
            None => {
                tracing::debug!(ise_id = id, "no state server configured, value dropped");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_state_server_everything_succeeds() {
        let dispatcher = Dispatcher::default();
        assert!(!dispatcher.has_state_server());
        assert!(dispatcher.publish("home/power", "12.5").is_ok());
        assert!(dispatcher.publish_state("4711", "12.5").is_ok());
    }
}
