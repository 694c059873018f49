//! Trailing moving average calculations
//!
//! Contains the windowed mean used for demand forecasting:
//! - `TrailingMean`: streaming mean over the last `period` observations
//! - `trailing_means`: batch helper producing one mean per observation
//!
//! Unlike a classic SMA, the trailing mean reports a value as soon as a single
//! observation has been seen. Until the window fills, it averages whatever is
//! available (observations 1 through `period` use windows of size 1 through
//! `period`).

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Trailing mean over at most `period` observations
#[derive(Debug, Clone)]
pub struct TrailingMean {
    period: usize,
    values: VecDeque<f64>,
}

impl TrailingMean {
    /// Create a new trailing mean with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Push a new observation, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Observation must be finite, got {}",
                value
            )));
        }

        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }

        Ok(())
    }

    /// Get the mean of the observations currently in the window
    pub fn value(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(MathError::InsufficientData(
                "No observations in window".to_string(),
            ));
        }

        // Summed fresh each time; the window is small and this keeps
        // results free of running-sum drift.
        let sum: f64 = self.values.iter().sum();
        Ok(sum / self.values.len() as f64)
    }

    /// Number of observations currently in the window
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no observation has been pushed since the last reset
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the window holds `period` observations
    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the mean, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Compute the trailing mean at every position of `values`
///
/// Position `i` gets the mean of `values[max(0, i + 1 - window)..=i]`.
/// An empty slice yields an empty vector.
pub fn trailing_means(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut mean = TrailingMean::new(window)?;
    let mut out = Vec::with_capacity(values.len());

    for &value in values {
        mean.update(value)?;
        out.push(mean.value()?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_mean_partial_window() {
        let mut mean = TrailingMean::new(3).unwrap();
        assert!(mean.value().is_err());

        mean.update(2.0).unwrap();
        assert_eq!(mean.value().unwrap(), 2.0);

        mean.update(4.0).unwrap();
        assert_eq!(mean.value().unwrap(), 3.0); // (2 + 4) / 2
        assert!(!mean.is_full());

        mean.update(6.0).unwrap();
        assert_eq!(mean.value().unwrap(), 4.0); // (2 + 4 + 6) / 3
        assert!(mean.is_full());

        mean.update(8.0).unwrap();
        assert_eq!(mean.value().unwrap(), 6.0); // (4 + 6 + 8) / 3
        assert_eq!(mean.len(), 3);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(matches!(
            TrailingMean::new(0),
            Err(MathError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut mean = TrailingMean::new(7).unwrap();
        assert!(mean.update(f64::NAN).is_err());
        assert!(mean.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut mean = TrailingMean::new(2).unwrap();
        mean.update(1.0).unwrap();
        mean.reset();
        assert!(mean.is_empty());
        assert_eq!(mean.period(), 2);
    }

    #[test]
    fn test_trailing_means_seven_day_window() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];
        let means = trailing_means(&values, 7).unwrap();
        assert_eq!(means, vec![10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 50.0]);
    }

    #[test]
    fn test_trailing_means_empty() {
        assert!(trailing_means(&[], 7).unwrap().is_empty());
    }
}
