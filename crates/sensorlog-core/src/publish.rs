//! # Collaborator Interfaces
//!
//! Everything the engine reaches outside of itself goes through these:
//! - `PublishSink`: best-effort delivery of values to a topic or a remote
//!   state target
//! - `Sink`: operator-facing messages
//! - `Context`: the bundle passed into each tick

use crate::SensorlogError;
use crate::clock::Clock;
use std::sync::Mutex;

/// Destination for published values.
///
/// Failures are reported to the caller, which logs and continues.
pub trait PublishSink: Send + Sync {
    /// Publish `payload` on a pub/sub topic.
    fn publish(&self, topic: &str, payload: &str) -> Result<(), SensorlogError>;

    /// Write `payload` to a remote state target.
    fn publish_state(&self, id: &str, payload: &str) -> Result<(), SensorlogError>;
}

/// Operator-facing message log.
pub trait Sink: Send + Sync {
    fn record(&self, message: &str, is_error: bool);
}

/// Forwards messages to `tracing`, dropping an immediate repetition.
#[derive(Debug, Default)]
pub struct TracingSink {
    last: Mutex<Option<String>>,
}

impl TracingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `message` differs from the previous one, and remembers it.
    fn is_new(&self, message: &str) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return true;
        };
        if last.as_deref() == Some(message) {
            return false;
        }
        *last = Some(message.to_string());
        true
    }
}

impl Sink for TracingSink {
    fn record(&self, message: &str, is_error: bool) {
        if !self.is_new(message) {
            return;
        }
        if is_error {
            tracing::error!("{}", message);
        } else {
            tracing::info!("{}", message);
        }
    }
}

/// Collaborators for one tick.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub clock: &'a dyn Clock,
    pub publisher: &'a dyn PublishSink,
    pub sink: &'a dyn Sink,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(clock: &'a dyn Clock, publisher: &'a dyn PublishSink, sink: &'a dyn Sink) -> Self {
        Self {
            clock,
            publisher,
            sink,
        }
    }

    /// Publish to a topic and a state target, logging failures.
    ///
    /// Empty targets are skipped.
    pub fn publish_to(&self, topic: Option<&str>, state: Option<&str>, payload: &str) {
        if let Some(topic) = topic.filter(|t| !t.is_empty()) {
            if let Err(e) = self.publisher.publish(topic, payload) {
                self.sink
                    .record(&format!("Cannot publish to topic {topic}: {e}"), true);
            }
        }
        if let Some(id) = state.filter(|s| !s.is_empty()) {
            if let Err(e) = self.publisher.publish_state(id, payload) {
                self.sink
                    .record(&format!("Cannot publish to state {id}: {e}"), true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_message_is_suppressed() {
        let sink = TracingSink::new();
        assert!(sink.is_new("a"));
        assert!(!sink.is_new("a"));
        assert!(sink.is_new("b"));
        assert!(sink.is_new("a"));
    }
}
