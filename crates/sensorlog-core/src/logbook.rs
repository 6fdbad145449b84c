//! # Logbook Module
//!
//! A set of columns written once per cycle.
//!
//! ## Schedule
//!
//! The next write is due at the first cycle boundary after construction.
//! A write evaluates every column over the window ending at the boundary
//! just crossed (`now - now % cycle_time`), so a late tick yields the same
//! row as a punctual one. The following write is scheduled one cycle after
//! that boundary.

use crate::column::{Column, ColumnConfig};
use crate::logfile;
use crate::primitives::{DEFAULT_CYCLE_TIME_MS, DEFAULT_MAX_ENTRIES, DEFAULT_MISSING_DATA_TOKEN};
use crate::publish::Context;
use crate::registry::Registry;
use crate::types::{LogbookId, SensorlogError, Timestamp};
use serde::Serialize;
use std::path::PathBuf;

/// Settings of a logbook, as read from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogbookConfig {
    /// Target file; `None` disables file output.
    pub filename: Option<PathBuf>,
    pub cycle_time: u64,
    pub max_entries: usize,
    pub missing_data: String,
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            filename: None,
            cycle_time: DEFAULT_CYCLE_TIME_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
            missing_data: DEFAULT_MISSING_DATA_TOKEN.to_string(),
        }
    }
}

/// One produced row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    pub slot: Timestamp,
    pub values: Vec<String>,
}

#[derive(Debug)]
pub struct Logbook {
    id: LogbookId,
    config: LogbookConfig,
    columns: Vec<Column>,
    next_scheduled: Timestamp,
}

impl Logbook {
    /// Create a logbook whose first write is due at the boundary after `now`.
    ///
    /// A zero cycle time falls back to the default.
    #[must_use]
    pub fn new(id: LogbookId, mut config: LogbookConfig, now: Timestamp) -> Self {
        if config.cycle_time == 0 {
            config.cycle_time = DEFAULT_CYCLE_TIME_MS;
        }
        let next_scheduled = next_boundary(now, config.cycle_time);
        Self {
            id,
            config,
            columns: Vec::new(),
            next_scheduled,
        }
    }

    #[must_use]
    pub fn id(&self) -> LogbookId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &LogbookConfig {
        &self.config
    }

    #[must_use]
    pub fn cycle_time(&self) -> u64 {
        self.config.cycle_time
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn next_scheduled(&self) -> Timestamp {
        self.next_scheduled
    }

    /// Bind and append a column.
    pub fn add_column(
        &mut self,
        registry: &mut Registry,
        config: ColumnConfig,
        now: Timestamp,
    ) -> Result<&Column, SensorlogError> {
        let column = Column::new(config, self.id, self.config.cycle_time, registry, now)?;
        self.columns.push(column);
        let last = self.columns.len() - 1;
        Ok(&self.columns[last])
    }

    /// Change the cycle time and recompute each column's cycle count.
    pub fn set_cycle_time(&mut self, registry: &mut Registry, cycle_time: u64, now: Timestamp) {
        self.config.cycle_time = if cycle_time == 0 {
            DEFAULT_CYCLE_TIME_MS
        } else {
            cycle_time
        };
        for column in &mut self.columns {
            column.recalculate_cycles(self.config.cycle_time, registry);
        }
        self.next_scheduled = next_boundary(now, self.config.cycle_time);
    }

    /// Header line of the log file.
    #[must_use]
    pub fn header(&self) -> String {
        logfile::header(self.columns.iter().map(|c| (c.title(), c.unit())))
    }

    /// Write a row if a cycle boundary has been crossed.
    pub fn write(&mut self, registry: &mut Registry, ctx: &Context<'_>) -> Option<LogRow> {
        let now = ctx.clock.now();
        if now < self.next_scheduled {
            return None;
        }

        let cycle_time = self.config.cycle_time;
        let slot = now - now % cycle_time;
        let missing = self.config.missing_data.as_str();

        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let start = slot.saturating_sub(column.evaluation_period());
            let value = match column.evaluate(registry, start, slot) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(
                        logbook = self.id.0,
                        column = column.title(),
                        error = %e,
                        "column has no value"
                    );
                    missing.to_string()
                }
            };

            if value != missing {
                let config = column.config();
                ctx.publish_to(
                    config.publish_topic.as_deref(),
                    config.publish_state.as_deref(),
                    &value,
                );
            }
            values.push(value);
        }

        if let Some(path) = &self.config.filename {
            let written = logfile::format_row(slot, &values).and_then(|row| {
                logfile::append_row(path, &self.header(), self.config.max_entries, &row)
            });
            if let Err(e) = written {
                ctx.sink.record(
                    &format!("Cannot write logbook {}: {e}", path.display()),
                    true,
                );
            }
        }

        for column in &self.columns {
            column.start_new_cycle(registry, slot);
        }

        self.next_scheduled = slot + cycle_time;
        Some(LogRow { slot, values })
    }
}

fn next_boundary(now: Timestamp, cycle_time: u64) -> Timestamp {
    now - now % cycle_time + cycle_time
}

// =============================================================================
// TESTS
// =============================================================================
