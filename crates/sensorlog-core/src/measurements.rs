//! # Measurement Store
//!
//! Time-ordered sample history of one data source.
//!
//! - Samples are admitted only after the minimum rest period
//! - Counter-mode sources keep a single, overwritten sample
//! - At most `MAX_MEASUREMENTS` samples are retained, oldest evicted first
//! - Window queries can reject outliers around the median

use crate::primitives::MAX_MEASUREMENTS;
use crate::stats;
use crate::types::{SensorlogError, Timestamp, time_diff};
use std::collections::VecDeque;

/// One admitted value and the time it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Bounded sample history with rest-period admission.
#[derive(Debug, Clone, Default)]
pub struct MeasurementStore {
    samples: VecDeque<Sample>,
    min_rest_period: u64,
}

impl MeasurementStore {
    #[must_use]
    pub fn new(min_rest_period: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            min_rest_period,
        }
    }

    #[must_use]
    pub fn min_rest_period(&self) -> u64 {
        self.min_rest_period
    }

    pub fn set_min_rest_period(&mut self, ms: u64) {
        self.min_rest_period = ms;
    }

    /// Append a sample unless it arrives within the rest period of (or
    /// before) the last admitted one. Returns whether it was admitted.
    pub fn admit(&mut self, value: f64, timestamp: Timestamp) -> bool {
        let too_early = self.samples.back().is_some_and(|last| {
            timestamp < last.timestamp
                || time_diff(timestamp, last.timestamp) < self.min_rest_period
        });
        if too_early {
            return false;
        }

        self.samples.push_back(Sample { timestamp, value });
        while self.samples.len() > MAX_MEASUREMENTS {
            self.samples.pop_front();
        }
        true
    }

    /// Replace the whole history by one sample (counter mode).
    pub fn set_only_value(&mut self, value: f64, timestamp: Timestamp) {
        self.samples.clear();
        self.samples.push_back(Sample { timestamp, value });
    }

    /// Drop every sample strictly older than `cutoff`.
    pub fn evict_before(&mut self, cutoff: Timestamp) {
        while self
            .samples
            .front()
            .is_some_and(|sample| sample.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample.
    #[must_use]
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn last_value(&self) -> Result<f64, SensorlogError> {
        self.samples
            .back()
            .map(|sample| sample.value)
            .ok_or(SensorlogError::NoData)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Values newer than `since`, confidence-filtered.
    ///
    /// With both `absolute` and `sigma` at zero the selection is returned as
    /// is. Otherwise values farther from the median than
    /// `sigma * stddev_median` (or `|absolute|` when `sigma` is not positive)
    /// are dropped. A filter that drops everything leaves the median.
    #[must_use]
    pub fn windowed_values(&self, since: Timestamp, absolute: f64, sigma: f64) -> Vec<f64> {
        let selected = self
            .samples
            .iter()
            .filter(|sample| sample.timestamp > since)
            .map(|sample| sample.value)
            .collect();
        confidence_filter(selected, absolute, sigma)
    }

    /// Like [`windowed_values`](Self::windowed_values), restricted to
    /// `(since, until]`.
    #[must_use]
    pub fn windowed_values_between(
        &self,
        since: Timestamp,
        until: Timestamp,
        absolute: f64,
        sigma: f64,
    ) -> Vec<f64> {
        let selected = self
            .samples
            .iter()
            .filter(|sample| sample.timestamp > since && sample.timestamp <= until)
            .map(|sample| sample.value)
            .collect();
        confidence_filter(selected, absolute, sigma)
    }
}

fn confidence_filter(mut values: Vec<f64>, absolute: f64, sigma: f64) -> Vec<f64> {
    let absolute = absolute.abs();
    if absolute <= 0.0 && sigma <= 0.0 {
        return values;
    }

    let Ok(center) = stats::median(&values) else {
        return values;
    };

    let half_width = if sigma > 0.0 {
        sigma * stats::stddev_median(&values)
    } else {
        absolute
    };

    let (lower, upper) = (center - half_width, center + half_width);
    values.retain(|v| *v >= lower && *v <= upper);

    if values.is_empty() {
        values.push(center);
    }
    values
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(values: &[f64], spacing: u64) -> MeasurementStore {
        let mut store = MeasurementStore::new(spacing);
        for (i, v) in values.iter().enumerate() {
            assert!(store.admit(*v, (i as u64 + 1) * spacing));
        }
        store
    }

    #[test]
    fn rest_period_gates_admission() {
        let mut store = MeasurementStore::new(1_000);
        assert!(store.admit(1.0, 10_000));
        assert!(!store.admit(2.0, 10_500));
        assert!(store.admit(3.0, 11_000));
        assert_eq!(store.len(), 2);
        assert_eq!(store.last_value().expect("last"), 3.0);
    }

    #[test]
    fn older_timestamps_are_rejected() {
        let mut store = MeasurementStore::new(0);
        assert!(store.admit(1.0, 5_000));
        assert!(!store.admit(2.0, 4_000));
        assert!(store.admit(3.0, 5_000));
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut store = MeasurementStore::new(0);
        for i in 0..=MAX_MEASUREMENTS as u64 {
            store.admit(i as f64, i);
        }
        assert_eq!(store.len(), MAX_MEASUREMENTS);
        assert_eq!(store.iter().next().map(|s| s.timestamp), Some(1));
    }

    #[test]
    fn set_only_value_keeps_one_sample() {
        let mut store = store_with(&[1.0, 2.0, 3.0], 10);
        store.set_only_value(9.0, 5);
        assert_eq!(store.len(), 1);
        assert_eq!(store.last_value().expect("last"), 9.0);
    }

    #[test]
    fn evict_before_is_strict() {
        let mut store = store_with(&[1.0, 2.0, 3.0], 10);
        store.evict_before(20);
        assert_eq!(store.len(), 2);
        store.evict_before(1_000);
        assert!(store.is_empty());
        assert!(matches!(store.last_value(), Err(SensorlogError::NoData)));
    }

    #[test]
    fn window_excludes_start() {
        let store = store_with(&[1.0, 2.0, 3.0], 10);
        assert_eq!(store.windowed_values(10, 0.0, 0.0), vec![2.0, 3.0]);
        assert_eq!(store.windowed_values_between(0, 20, 0.0, 0.0), vec![1.0, 2.0]);
    }

    #[test]
    fn absolute_band_around_median() {
        let store = store_with(&[10.0, 11.0, 12.0, 20.0], 10);
        assert_eq!(store.windowed_values(0, -2.0, 0.0), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn sigma_band_rejects_outlier() {
        let store = store_with(&[10.0, 12.0, 11.0, 50.0], 60_000);
        assert_eq!(store.windowed_values(0, 0.0, 1.0), vec![10.0, 12.0, 11.0]);
    }

    #[test]
    fn sigma_band_edge_is_inclusive() {
        // median 11.5, stddev around median ~19.27; 2 sigma reaches past 50
        let store = store_with(&[10.0, 12.0, 11.0, 50.0], 60_000);
        assert_eq!(store.windowed_values(0, 0.0, 2.0).len(), 4);
    }

    #[test]
    fn sigma_takes_precedence_over_absolute() {
        let store = store_with(&[10.0, 12.0, 11.0, 50.0], 60_000);
        assert_eq!(store.windowed_values(0, 100.0, 1.0).len(), 3);
    }

    #[test]
    fn degenerate_filter_falls_back_to_median() {
        let store = store_with(&[1.0, 3.0], 10);
        // median 2, band [1.9, 2.1] holds nothing
        assert_eq!(store.windowed_values(0, 0.1, 0.0), vec![2.0]);
    }

    #[test]
    fn empty_window_stays_empty_with_filter() {
        let store = store_with(&[1.0, 3.0], 10);
        assert!(store.windowed_values(100, 0.0, 2.0).is_empty());
    }
}
