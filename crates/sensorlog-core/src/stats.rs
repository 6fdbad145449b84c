//! # Statistics Module
//!
//! Pure functions over a value set.
//!
//! - `sum` of an empty set is 0
//! - `mean`, `median`, `minimum`, `maximum` fail with `NoData` on an empty set
//! - Both standard deviations use the population formula and are 0 for
//!   fewer than two values

use crate::SensorlogError;

/// Sum of all values; 0 for an empty set.
#[must_use]
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64, SensorlogError> {
    if values.is_empty() {
        return Err(SensorlogError::NoData);
    }
    Ok(sum(values) / values.len() as f64)
}

/// Middle value of the sorted set; the average of the two middle values for
/// an even count.
pub fn median(values: &[f64]) -> Result<f64, SensorlogError> {
    if values.is_empty() {
        return Err(SensorlogError::NoData);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

pub fn minimum(values: &[f64]) -> Result<f64, SensorlogError> {
    values
        .iter()
        .copied()
        .min_by(f64::total_cmp)
        .ok_or(SensorlogError::NoData)
}

pub fn maximum(values: &[f64]) -> Result<f64, SensorlogError> {
    values
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .ok_or(SensorlogError::NoData)
}

/// Standard deviation around the mean.
#[must_use]
pub fn stddev_mean(values: &[f64]) -> f64 {
    match mean(values) {
        Ok(center) if values.len() > 1 => spread_around(values, center),
        _ => 0.0,
    }
}

/// Standard deviation around the median.
#[must_use]
pub fn stddev_median(values: &[f64]) -> f64 {
    match median(values) {
        Ok(center) if values.len() > 1 => spread_around(values, center),
        _ => 0.0,
    }
}

fn spread_around(values: &[f64], center: f64) -> f64 {
    let squares: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    (squares / values.len() as f64).sqrt()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_of_empty_is_zero() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(sum(&[1.0, 2.5]), 3.5);
    }

    #[test]
    fn empty_set_has_no_location() {
        assert!(matches!(mean(&[]), Err(SensorlogError::NoData)));
        assert!(matches!(median(&[]), Err(SensorlogError::NoData)));
        assert!(matches!(minimum(&[]), Err(SensorlogError::NoData)));
        assert!(matches!(maximum(&[]), Err(SensorlogError::NoData)));
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).expect("median"), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).expect("median"), 2.5);
        assert_eq!(median(&[7.0]).expect("median"), 7.0);
    }

    #[test]
    fn extrema() {
        let v = [3.0, -1.0, 8.5, 2.0];
        assert_eq!(minimum(&v).expect("min"), -1.0);
        assert_eq!(maximum(&v).expect("max"), 8.5);
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[10.0, 12.0, 11.0]).expect("mean"), 11.0);
    }

    #[test]
    fn stddev_is_zero_for_small_sets() {
        assert_eq!(stddev_mean(&[]), 0.0);
        assert_eq!(stddev_mean(&[5.0]), 0.0);
        assert_eq!(stddev_median(&[5.0]), 0.0);
    }

    #[test]
    fn stddev_uses_population_formula() {
        // mean 5, squared deviations 9+1+1+9 = 20, / 4 = 5
        let v = [2.0, 4.0, 6.0, 8.0];
        assert!((stddev_mean(&v) - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn stddev_median_centers_on_median() {
        // median 2, deviations -1, 0, 7
        let v = [1.0, 2.0, 9.0];
        let expected = (50.0_f64 / 3.0).sqrt();
        assert!((stddev_median(&v) - expected).abs() < 1e-12);
        assert!(stddev_median(&v) > stddev_mean(&v));
    }
}
