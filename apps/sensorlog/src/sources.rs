//! # Data-Source Adapters
//!
//! Concrete [`DataSource`] implementations for the engine:
//!
//! - `JsonSource`: a value inside a JSON document on disk or behind a URL
//! - `HomematicSource`: a system variable on the remote state server
//! - `PushSource`: a sensor fed from outside through `Registry::push`
//!
//! JSON documents are fetched through a shared [`ReadoutBuffer`], so several
//! sensors reading the same document within one tick cost one read.

use crate::homematic::HomematicClient;
use sensorlog_core::json::{self, JsonError, JsonNode};
use sensorlog_core::primitives::READOUT_BUFFER_MS;
use sensorlog_core::{DataSource, SensorlogError, Timestamp, time_diff};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Attempts to open a local file before giving up.
const FILE_READ_ATTEMPTS: usize = 2;

/// Pause between two file read attempts.
const FILE_RETRY_PAUSE: Duration = Duration::from_millis(100);

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle shared between all JSON sources of one collector.
pub type SharedReadout = Arc<Mutex<ReadoutBuffer>>;

// =============================================================================
// READOUT BUFFER
// =============================================================================

#[derive(Debug, Default)]
struct CachedRead {
    content: String,
    read_at: Timestamp,
}

/// Short-lived cache of file and URL contents.
#[derive(Debug)]
pub struct ReadoutBuffer {
    http: reqwest::blocking::Client,
    entries: HashMap<String, CachedRead>,
}

impl ReadoutBuffer {
    pub fn new() -> Result<Self, SensorlogError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SensorlogError::Config(format!("Cannot create HTTP client: {e}")))?;
        Ok(Self {
            http,
            entries: HashMap::new(),
        })
    }

    pub fn shared() -> Result<SharedReadout, SensorlogError> {
        Ok(Arc::new(Mutex::new(Self::new()?)))
    }

    /// Contents of `location`, re-read only if the cached copy is older
    /// than the buffer time.
    pub fn contents(&mut self, location: &str, now: Timestamp) -> Result<String, SensorlogError> {
        if let Some(entry) = self.entries.get(location) {
            if time_diff(entry.read_at, now) <= READOUT_BUFFER_MS {
                return Ok(entry.content.clone());
            }
        }

        let content = if is_url(location) {
            self.fetch(location)?
        } else {
            read_file(location)?
        };

        self.entries.insert(
            location.to_string(),
            CachedRead {
                content: content.clone(),
                read_at: now,
            },
        );
        Ok(content)
    }

    /// Drop every entry older than the buffer time.
    pub fn clean_up(&mut self, now: Timestamp) {
        self.entries
            .retain(|_, entry| time_diff(entry.read_at, now) <= READOUT_BUFFER_MS);
    }

    #[must_use]
    pub fn cached(&self) -> usize {
        self.entries.len()
    }

    fn fetch(&self, url: &str) -> Result<String, SensorlogError> {
        self.http
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| SensorlogError::SourceRead(format!("Cannot read from {url}: {e}")))
    }
}

#[must_use]
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn read_file(path: &str) -> Result<String, SensorlogError> {
    let mut last_error = None;
    for attempt in 0..FILE_READ_ATTEMPTS {
        if attempt > 0 {
            std::thread::sleep(FILE_RETRY_PAUSE);
        }
        match std::fs::read_to_string(path) {
            Ok(content) => return Ok(content),
            Err(e) => last_error = Some(e),
        }
    }
    let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
    Err(SensorlogError::SourceRead(format!(
        "Cannot open file {path}: {reason}"
    )))
}

// =============================================================================
// KEY PATHS
// =============================================================================

/// Follow `keys` from `root`, one child per key.
pub fn lookup<'a>(root: &'a JsonNode, keys: &[String]) -> Result<&'a JsonNode, JsonError> {
    keys.iter().try_fold(root, |node, key| node.element(key))
}

/// Numeric value at `keys` inside the JSON text `content`.
pub fn value_at(content: &str, keys: &[String]) -> Result<f64, JsonError> {
    let root = json::parse(content)?;
    lookup(&root, keys)?.value().as_float()
}

/// Numeric value of a pub/sub payload: the payload itself, or the value at
/// `keys` if the payload is a JSON document.
pub fn decode_payload(payload: &str, keys: &[String]) -> Result<f64, SensorlogError> {
    if keys.is_empty() {
        return payload.trim().parse::<f64>().map_err(|_| {
            SensorlogError::SourceRead(format!("Payload is not numeric: '{payload}'"))
        });
    }
    Ok(value_at(payload, keys)?)
}

// =============================================================================
// SOURCES
// =============================================================================

/// A value inside a JSON document.
#[derive(Debug)]
pub struct JsonSource {
    location: String,
    keys: Vec<String>,
    buffer: SharedReadout,
}

impl JsonSource {
    #[must_use]
    pub fn new(location: impl Into<String>, keys: Vec<String>, buffer: SharedReadout) -> Self {
        Self {
            location: location.into(),
            keys,
            buffer,
        }
    }
}

impl DataSource for JsonSource {
    fn kind(&self) -> &'static str {
        "json"
    }

    fn sample(&mut self, now: Timestamp) -> Result<Option<f64>, SensorlogError> {
        if self.keys.is_empty() {
            return Ok(None);
        }

        let content = {
            let mut buffer = self
                .buffer
                .lock()
                .map_err(|_| SensorlogError::SourceRead("readout buffer poisoned".into()))?;
            buffer.contents(&self.location, now)?
        };

        let value = value_at(&content, &self.keys).map_err(|e| {
            SensorlogError::SourceRead(format!(
                "No value at [{}] in {}: {e}",
                self.keys.join(", "),
                self.location
            ))
        })?;
        Ok(Some(value))
    }
}

/// A system variable on the remote state server.
#[derive(Debug)]
pub struct HomematicSource {
    client: Arc<HomematicClient>,
    datapoint: String,
}

impl HomematicSource {
    #[must_use]
    pub fn new(client: Arc<HomematicClient>, datapoint: impl Into<String>) -> Self {
        Self {
            client,
            datapoint: datapoint.into(),
        }
    }
}

impl DataSource for HomematicSource {
    fn kind(&self) -> &'static str {
        "homematic"
    }

    fn sample(&mut self, _now: Timestamp) -> Result<Option<f64>, SensorlogError> {
        self.client.read_state(&self.datapoint).map(Some)
    }
}

/// Never polled; values arrive through `Registry::push`.
#[derive(Debug, Default)]
pub struct PushSource;

impl DataSource for PushSource {
    fn kind(&self) -> &'static str {
        "subscription"
    }

    fn sample(&mut self, _now: Timestamp) -> Result<Option<f64>, SensorlogError> {
        Ok(None)
    }
}
