//! # Pulse Counter Engine
//!
//! Event counting per logbook cycle, with rolling retention of past cycles.
//!
//! - `CycleCounter`: count and inter-event spacing of one cycle
//! - `Counter`: the retained cycles, oldest first; the last one is open
//!
//! ## Retention
//!
//! `cycles_to_store` is a high-water mark raised by every column sharing the
//! counter. Zero means unbounded. Cycles rotate only forward in time.

use crate::types::{Timestamp, time_diff};
use serde::Serialize;

// =============================================================================
// CYCLE COUNTER
// =============================================================================

/// Events counted during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCounter {
    count: u64,
    start: Timestamp,
    finish: Option<Timestamp>,
    last_event: Option<Timestamp>,
    min_spacing: Option<u64>,
    max_spacing: Option<u64>,
}

impl CycleCounter {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            count: 0,
            start,
            finish: None,
            last_event: None,
            min_spacing: None,
            max_spacing: None,
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub fn finish(&self) -> Option<Timestamp> {
        self.finish
    }

    /// Count one event and update the spacing bounds.
    pub fn record_event(&mut self, timestamp: Timestamp) {
        self.count += 1;

        if let Some(previous) = self.last_event {
            let spacing = time_diff(timestamp, previous);
            if spacing > 0 {
                self.min_spacing = Some(self.min_spacing.map_or(spacing, |m| m.min(spacing)));
                self.max_spacing = Some(self.max_spacing.map_or(spacing, |m| m.max(spacing)));
            }
        }

        self.last_event = Some(timestamp);
    }

    /// Close the cycle at `timestamp`.
    pub fn close(&mut self, timestamp: Timestamp) {
        self.finish = Some(timestamp);
    }

    /// Events per second between the cycle start and `end`.
    ///
    /// The span is counted in whole seconds; a span below one second gives 0.
    #[must_use]
    pub fn frequency_until(&self, end: Timestamp) -> f64 {
        let seconds = time_diff(self.start, end) / 1000;
        if self.count == 0 || seconds == 0 {
            return 0.0;
        }
        self.count as f64 / seconds as f64
    }

    /// Frequency over the closed cycle; 0 while the cycle is open.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.finish.map_or(0.0, |end| self.frequency_until(end))
    }

    /// Slowest instantaneous rate, from the largest spacing.
    #[must_use]
    pub fn frequency_min(&self) -> f64 {
        self.max_spacing.map_or(0.0, |s| 1000.0 / s as f64)
    }

    /// Fastest instantaneous rate, from the smallest spacing.
    #[must_use]
    pub fn frequency_max(&self) -> f64 {
        self.min_spacing.map_or(0.0, |s| 1000.0 / s as f64)
    }
}

// =============================================================================
// COUNTER
// =============================================================================

/// Aggregate over the most recent cycles of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CounterAggregate {
    pub count: u64,
    pub frequency: f64,
    pub frequency_min: f64,
    pub frequency_max: f64,
}

/// Rolling set of cycle counters.
#[derive(Debug, Clone)]
pub struct Counter {
    cycles: Vec<CycleCounter>,
    cycles_to_store: usize,
}

impl Counter {
    /// Counter with one open cycle starting at `start`, retaining one cycle.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            cycles: vec![CycleCounter::new(start)],
            cycles_to_store: 1,
        }
    }

    #[must_use]
    pub fn cycles_to_store(&self) -> usize {
        self.cycles_to_store
    }

    /// Retained cycles, oldest first. The last one is open.
    #[must_use]
    pub fn cycles(&self) -> &[CycleCounter] {
        &self.cycles
    }

    /// Raise the retention high-water mark. Zero switches to unbounded.
    pub fn accumulate_cycles_to_store(&mut self, cycles: usize) {
        if self.cycles_to_store == 0 {
            return;
        }
        if cycles == 0 || cycles > self.cycles_to_store {
            self.cycles_to_store = cycles;
        }
    }

    fn current(&self) -> Option<&CycleCounter> {
        self.cycles.last()
    }

    pub fn record_event(&mut self, timestamp: Timestamp) {
        if let Some(current) = self.cycles.last_mut() {
            current.record_event(timestamp);
        }
    }

    /// Close the open cycle and open a new one at `timestamp`.
    ///
    /// No-op unless `timestamp` is later than the open cycle's start.
    pub fn start_new_cycle(&mut self, timestamp: Timestamp) {
        let Some(current) = self.cycles.last_mut() else {
            self.cycles.push(CycleCounter::new(timestamp));
            return;
        };

        if timestamp <= current.start() {
            return;
        }

        current.close(timestamp);

        if self.cycles_to_store > 0 {
            while self.cycles.len() >= self.cycles_to_store {
                self.cycles.remove(0);
            }
        }

        self.cycles.push(CycleCounter::new(timestamp));
    }

    /// Drop every cycle and open a fresh one at `timestamp`.
    pub fn reset(&mut self, timestamp: Timestamp) {
        self.cycles.clear();
        self.cycles.push(CycleCounter::new(timestamp));
    }

    /// Aggregate the `n_cycles` most recent cycles, evaluated at `now`.
    ///
    /// `1` reads only the open cycle. `0` reads every retained cycle. More
    /// cycles than retained read what is retained.
    #[must_use]
    pub fn aggregate(&self, n_cycles: usize, now: Timestamp) -> CounterAggregate {
        let Some(current) = self.current() else {
            return CounterAggregate::default();
        };

        if n_cycles == 1 {
            return CounterAggregate {
                count: current.count(),
                frequency: current.frequency_until(now),
                frequency_min: current.frequency_min(),
                frequency_max: current.frequency_max(),
            };
        }

        let take = if n_cycles == 0 {
            self.cycles.len()
        } else {
            n_cycles.min(self.cycles.len())
        };

        let mut aggregate = CounterAggregate {
            frequency_min: current.frequency_min(),
            frequency_max: current.frequency_max(),
            ..CounterAggregate::default()
        };
        let mut oldest_start = current.start();

        for cycle in self.cycles.iter().rev().take(take) {
            aggregate.count += cycle.count();
            aggregate.frequency_min = aggregate.frequency_min.min(cycle.frequency_min());
            aggregate.frequency_max = aggregate.frequency_max.max(cycle.frequency_max());
            oldest_start = cycle.start();
        }

        let seconds = time_diff(oldest_start, now) / 1000;
        aggregate.frequency = if seconds == 0 {
            0.0
        } else {
            aggregate.count as f64 / seconds as f64
        };

        aggregate
    }
}

// =============================================================================
// TESTS
// =============================================================================
