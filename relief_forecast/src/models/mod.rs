//! Demand models applied to a single item's usage history

use crate::error::Result;
use std::fmt::Debug;

/// A model turning one item's date-ordered quantities into per-row forecasts
///
/// Implementations receive a single partition at a time, so a model never
/// sees rows belonging to another item. The returned vector must have the
/// same length as `quantities`.
pub trait DemandModel: Debug + Clone {
    /// Forecast demand at every position of the history
    fn forecast_history(&self, quantities: &[f64]) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

pub mod moving_average;

pub use moving_average::TrailingAverage;
