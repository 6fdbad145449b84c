//! # Configuration
//!
//! Loads the collector configuration from a JSON file, parsed with the core
//! document model.
//!
//! Field-level problems are logged and the field falls back to its default.
//! A sensor without an id or data source, or a column without a known
//! sensor, is skipped. Only an unreadable or unparsable file is fatal.
//!
//! ```json
//! {
//!   "general":   { "logfile": "/var/log/sensorlog.log" },
//!   "homematic": { "xmlapi_url": "http://ccu/addons/xmlapi" },
//!   "sensors":   [ { "sensor_id": "power", "json_file": "meter.json",
//!                    "json_key": ["total", "kwh"],
//!                    "rest_period": { "value": 30, "unit": "s" } } ],
//!   "logbooks":  [ { "filename": "power.txt",
//!                    "cycle_time": { "value": 15, "unit": "min" },
//!                    "columns": [ { "sensor_id": "power", "title": "Energy",
//!                                   "unit": "kWh", "operation": "max" } ] } ]
//! }
//! ```

use sensorlog_core::json::{self, JsonNode};
use sensorlog_core::primitives::{
    DEFAULT_CYCLE_TIME_MS, DEFAULT_MAX_ENTRIES, DEFAULT_MISSING_DATA_TOKEN, DEFAULT_REST_PERIOD_MS,
};
use sensorlog_core::{ColumnConfig, LogbookConfig, Operation, SensorConfig, SensorId, SensorlogError};
use std::path::{Path, PathBuf};

/// Configuration file used when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sensorlogger.json";

const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTT_QOS: u8 = 1;

// =============================================================================
// SETTINGS
// =============================================================================

/// Broker settings. Parsed and reported; no transport is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub qos: u8,
    pub retained: bool,
    pub connected_topic: Option<String>,
    pub connected_message: Option<String>,
    pub lwt_topic: Option<String>,
    pub lwt_message: Option<String>,
}

/// Where a sensor gets its values from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A value inside a JSON file or URL.
    JsonFile { location: String, keys: Vec<String> },
    /// Values pushed on a pub/sub topic.
    Subscription { topic: String, keys: Vec<String> },
    /// A system variable on the remote state server.
    Homematic { datapoint: String },
}

impl SourceSpec {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JsonFile { .. } => "json",
            Self::Subscription { .. } => "subscription",
            Self::Homematic { .. } => "homematic",
        }
    }

    /// True for sources that only receive pushed values.
    ///
    /// No pub/sub transport is attached, so these sensors stay without data
    /// unless something calls `Runtime::route`.
    #[must_use]
    pub fn is_push_driven(&self) -> bool {
        matches!(self, Self::Subscription { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSpec {
    pub config: SensorConfig,
    pub source: SourceSpec,
}

/// A column as configured; the sensor is still referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub sensor_id: String,
    pub title: String,
    pub unit: String,
    pub operation: Operation,
    pub evaluation_period: u64,
    pub confidence_absolute: f64,
    pub confidence_sigma: f64,
    pub count_factor: f64,
    pub publish_topic: Option<String>,
    pub publish_state: Option<String>,
}

impl ColumnSpec {
    /// Engine column settings bound to the resolved sensor.
    #[must_use]
    pub fn to_config(&self, sensor: SensorId) -> ColumnConfig {
        ColumnConfig {
            sensor,
            title: self.title.clone(),
            unit: self.unit.clone(),
            operation: self.operation,
            evaluation_period: self.evaluation_period,
            confidence_absolute: self.confidence_absolute,
            confidence_sigma: self.confidence_sigma,
            count_factor: self.count_factor,
            publish_topic: self.publish_topic.clone(),
            publish_state: self.publish_state.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogbookSpec {
    pub config: LogbookConfig,
    pub columns: Vec<ColumnSpec>,
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    pub logfile: Option<PathBuf>,
    pub homematic_url: Option<String>,
    pub mqtt: Option<MqttSettings>,
    pub sensors: Vec<SensorSpec>,
    pub logbooks: Vec<LogbookSpec>,
}

impl Settings {
    /// Read and interpret the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, SensorlogError> {
        let root = read_document(path)?;
        tracing::info!(config = %path.display(), "configuration loaded");
        Ok(Self::from_document(&root))
    }

    /// Interpret a parsed configuration document.
    #[must_use]
    pub fn from_document(root: &JsonNode) -> Self {
        let mut settings = Self::default();

        if let Some(general) = present(root, "general") {
            settings.logfile = Fields::new(general, "general")
                .string("logfile")
                .map(PathBuf::from);
        }
        if settings.logfile.is_none() {
            tracing::info!("No logfile given under general/logfile. Logging into file is disabled.");
        }

        if let Some(homematic) = present(root, "homematic") {
            settings.homematic_url = Fields::new(homematic, "homematic").string("xmlapi_url");
        }

        if let Some(mqtt) = present(root, "mqtt") {
            settings.mqtt = parse_mqtt(mqtt);
        }

        match present(root, "sensors") {
            Some(sensors) => {
                for (i, node) in sensors.children().iter().enumerate() {
                    if let Some(sensor) = settings.parse_sensor(i + 1, node) {
                        settings.sensors.push(sensor);
                    }
                }
            }
            None => tracing::error!("No valid sensor configuration found."),
        }

        if let Some(logbooks) = present(root, "logbooks") {
            for (i, node) in logbooks.children().iter().enumerate() {
                let logbook = settings.parse_logbook(i + 1, node);
                settings.logbooks.push(logbook);
            }
        }

        settings
    }

    #[must_use]
    pub fn sensor(&self, id: &str) -> Option<&SensorSpec> {
        self.sensors.iter().find(|s| s.config.id == id)
    }

    fn parse_sensor(&self, n: usize, node: &JsonNode) -> Option<SensorSpec> {
        let fields = Fields::new(node, format!("sensor #{n}"));

        let Some(id) = fields.string("sensor_id") else {
            tracing::error!("Sensor #{}: sensor_id not found in config file.", n);
            return None;
        };
        if self.sensor(&id).is_some() {
            tracing::error!("Sensor #{}: duplicate sensor_id '{}', skipped.", n, id);
            return None;
        }
        let fields = Fields::new(node, format!("sensor #{n} ({id})"));

        let mut config = SensorConfig::new(id.as_str());
        config.counter_mode = fields.boolean("counter", false);
        config.factor = fields.float("factor", 1.0);
        config.offset = fields.float("offset", 0.0);
        config.rest_period = fields.duration("rest_period", DEFAULT_REST_PERIOD_MS);
        config.publish_topic = fields.string("mqtt_publish");
        config.publish_state = fields.string("homematic_publish");

        let keys = fields.keys("json_key");
        let source = if let Some(location) = fields.string("json_file") {
            if keys.is_empty() {
                tracing::warn!("Sensor {}: json_file without json_key is never measured.", id);
            }
            SourceSpec::JsonFile { location, keys }
        } else if fields.string("tinkerforge_uid").is_some() {
            tracing::error!("Sensor {}: Tinkerforge bricklets are not supported, skipped.", id);
            return None;
        } else if let Some(topic) = fields.string("mqtt_subscribe") {
            // republishing onto the subscribed topic would feed back into itself
            if config.publish_topic.as_deref() == Some(topic.as_str()) {
                config.publish_topic = None;
            }
            SourceSpec::Subscription { topic, keys }
        } else if let Some(datapoint) = fields.string("homematic_subscribe") {
            if self.homematic_url.is_none() {
                tracing::error!(
                    "Sensor {}: homematic_subscribe needs homematic/xmlapi_url, skipped.",
                    id
                );
                return None;
            }
            SourceSpec::Homematic { datapoint }
        } else {
            tracing::error!("Sensor {}: no data source configured, skipped.", id);
            return None;
        };

        Some(SensorSpec { config, source })
    }

    fn parse_logbook(&self, n: usize, node: &JsonNode) -> LogbookSpec {
        let fields = Fields::new(node, format!("logbook #{n}"));

        let filename = fields.string("filename").map(PathBuf::from);
        if filename.is_none() {
            tracing::warn!("Logbook #{}: no filename specified.", n);
        }

        let config = LogbookConfig {
            filename,
            cycle_time: fields.duration("cycle_time", DEFAULT_CYCLE_TIME_MS),
            max_entries: fields.count("max_entries", DEFAULT_MAX_ENTRIES),
            missing_data: fields
                .string("missing_data")
                .unwrap_or_else(|| DEFAULT_MISSING_DATA_TOKEN.to_string()),
        };

        let mut columns = Vec::new();
        if let Some(nodes) = present(node, "columns") {
            for (c, column) in nodes.children().iter().enumerate() {
                if let Some(spec) = self.parse_column(n, c + 1, column) {
                    columns.push(spec);
                }
            }
        }

        LogbookSpec { config, columns }
    }

    fn parse_column(&self, n: usize, c: usize, node: &JsonNode) -> Option<ColumnSpec> {
        let fields = Fields::new(node, format!("logbook #{n}, column #{c}"));

        let Some(sensor_id) = fields.string("sensor_id") else {
            tracing::error!("Logbook #{}, column #{}: sensor_id not found.", n, c);
            return None;
        };
        if self.sensor(&sensor_id).is_none() {
            tracing::error!(
                "Logbook #{}, column #{}: sensor '{}' not found.",
                n,
                c,
                sensor_id
            );
            return None;
        }

        let title = fields.string("title").unwrap_or_else(|| {
            tracing::warn!("Logbook #{}, column #{}: no title found.", n, c);
            String::new()
        });

        let operation = match fields.string("operation") {
            Some(name) => name.parse().unwrap_or_else(|_| {
                tracing::error!(
                    "Logbook #{}, column #{}: '{}' is not a valid operation.",
                    n,
                    c,
                    name
                );
                Operation::default()
            }),
            None => {
                tracing::error!("Logbook #{}, column #{}: no operation found.", n, c);
                Operation::default()
            }
        };

        Some(ColumnSpec {
            sensor_id,
            title,
            unit: fields.string("unit").unwrap_or_default(),
            operation,
            evaluation_period: fields.duration("evaluation_period", 0),
            confidence_absolute: fields.float("confidence_absolute", 0.0),
            confidence_sigma: fields.float("confidence_sigma", 0.0),
            count_factor: fields.float("count_factor", 1.0),
            publish_topic: fields.string("mqtt_publish"),
            publish_state: fields.string("homematic_publish"),
        })
    }
}

fn parse_mqtt(node: &JsonNode) -> Option<MqttSettings> {
    let fields = Fields::new(node, "mqtt");
    let host = fields.string("host")?;

    let port = u16::try_from(fields.count("port", usize::from(DEFAULT_MQTT_PORT)))
        .unwrap_or(DEFAULT_MQTT_PORT);
    let qos = u8::try_from(fields.count("qos", usize::from(DEFAULT_MQTT_QOS)))
        .ok()
        .filter(|q| *q <= 2)
        .unwrap_or_else(|| {
            tracing::warn!("mqtt: qos must be 0, 1 or 2. Default to {}.", DEFAULT_MQTT_QOS);
            DEFAULT_MQTT_QOS
        });

    Some(MqttSettings {
        host,
        port,
        qos,
        retained: fields.boolean("retained", false),
        connected_topic: fields.string("connected_topic"),
        connected_message: fields.string("connected_message"),
        lwt_topic: fields.string("lwt_topic"),
        lwt_message: fields.string("lwt_message"),
    })
}

// =============================================================================
// DOCUMENT ACCESS
// =============================================================================

/// Read and parse a JSON file.
pub fn read_document(path: &Path) -> Result<JsonNode, SensorlogError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        SensorlogError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(json::parse(&text)?)
}

/// `general.logfile` of the file at `path`, without logging anything.
#[must_use]
pub fn logfile_of(path: &Path) -> Option<PathBuf> {
    let root = read_document(path).ok()?;
    let logfile = present(root.get("general")?, "logfile")?;
    logfile.value().as_string().ok().map(PathBuf::from)
}

fn present<'a>(node: &'a JsonNode, name: &str) -> Option<&'a JsonNode> {
    if node.exists_and_not_null(name) {
        node.get(name)
    } else {
        None
    }
}

/// Typed access to the optional fields of one configuration object.
struct Fields<'a> {
    node: &'a JsonNode,
    context: String,
}

impl<'a> Fields<'a> {
    fn new(node: &'a JsonNode, context: impl Into<String>) -> Self {
        Self {
            node,
            context: context.into(),
        }
    }

    fn invalid(&self, name: &str, error: &dyn std::fmt::Display) {
        tracing::warn!(
            "{}: invalid '{}' ({}), using default.",
            self.context,
            name,
            error
        );
    }

    fn string(&self, name: &str) -> Option<String> {
        let node = present(self.node, name)?;
        match node.value().as_string() {
            Ok(s) => Some(s),
            Err(e) => {
                self.invalid(name, &e);
                None
            }
        }
    }

    fn float(&self, name: &str, default: f64) -> f64 {
        let Some(node) = present(self.node, name) else {
            return default;
        };
        node.value().as_float().unwrap_or_else(|e| {
            self.invalid(name, &e);
            default
        })
    }

    fn boolean(&self, name: &str, default: bool) -> bool {
        let Some(node) = present(self.node, name) else {
            return default;
        };
        node.value().as_bool().unwrap_or_else(|e| {
            self.invalid(name, &e);
            default
        })
    }

    /// A non-negative integer.
    fn count(&self, name: &str, default: usize) -> usize {
        let Some(node) = present(self.node, name) else {
            return default;
        };
        match node.value().as_int() {
            Ok(v) => usize::try_from(v).unwrap_or_else(|_| {
                self.invalid(name, &"negative");
                default
            }),
            Err(e) => {
                self.invalid(name, &e);
                default
            }
        }
    }

    fn duration(&self, name: &str, default: u64) -> u64 {
        let Some(node) = present(self.node, name) else {
            return default;
        };
        node.duration_ms().unwrap_or_else(|e| {
            self.invalid(name, &e);
            default
        })
    }

    /// A single key or a list of keys.
    fn keys(&self, name: &str) -> Vec<String> {
        let Some(node) = present(self.node, name) else {
            return Vec::new();
        };
        if node.is_leaf() {
            return self.string(name).into_iter().collect();
        }
        node.children()
            .iter()
            .filter_map(|key| match key.value().as_string() {
                Ok(s) => Some(s),
                Err(e) => {
                    self.invalid(name, &e);
                    None
                }
            })
            .collect()
    }
}
