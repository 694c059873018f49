//! Trailing moving average demand model

use crate::error::{ForecastError, Result};
use crate::models::DemandModel;
use relief_math::trailing_means;

/// Default number of rows averaged by the forecast
pub const DEFAULT_WINDOW: usize = 7;

/// Trailing moving average over the current row and up to `window - 1`
/// preceding rows
#[derive(Debug, Clone)]
pub struct TrailingAverage {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
}

impl TrailingAverage {
    /// Create a new trailing average model
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Trailing Moving Average (window={})", window),
            window,
        })
    }

    /// Get the window size
    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for TrailingAverage {
    fn default() -> Self {
        Self {
            name: format!("Trailing Moving Average (window={})", DEFAULT_WINDOW),
            window: DEFAULT_WINDOW,
        }
    }
}

impl DemandModel for TrailingAverage {
    fn forecast_history(&self, quantities: &[f64]) -> Result<Vec<f64>> {
        Ok(trailing_means(quantities, self.window)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
