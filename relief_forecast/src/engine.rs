//! Forecast engine
//!
//! Cleans raw usage rows and attaches a per-item demand forecast to each of
//! them. The processing is:
//!
//! 1. missing quantities become `0` (no usage reported),
//! 2. rows are partitioned by item,
//! 3. each partition is ordered by date, equal dates keeping input order,
//! 4. the [`DemandModel`] runs over each partition's quantities.
//!
//! Output rows come back in input order, one per input row.

use crate::data::{
    ColumnMapping, ForecastRecord, ForecastTable, UsageRecord, UsageTable, FORECAST_COLUMN,
    MISSING_FLAG_COLUMN,
};
use crate::error::Result;
use crate::models::{DemandModel, TrailingAverage};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Applies a demand model to every item partition of a usage table
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine<M: DemandModel = TrailingAverage> {
    model: M,
}

impl ForecastEngine<TrailingAverage> {
    /// Engine using a trailing average over `window` rows
    pub fn with_window(window: usize) -> Result<Self> {
        Ok(Self::new(TrailingAverage::new(window)?))
    }
}

impl<M: DemandModel> ForecastEngine<M> {
    /// Create an engine around the given model
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Get the model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Clean and forecast a sequence of usage records
    pub fn compute(&self, records: &[UsageRecord]) -> Result<Vec<ForecastRecord>> {
        if records.is_empty() {
            info!("No usage rows supplied; forecast is empty");
            return Ok(Vec::new());
        }

        let mut partitions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            partitions
                .entry(record.item_id.as_str())
                .or_default()
                .push(idx);
        }

        let mut forecasts = vec![0.0; records.len()];
        for (item, mut rows) in partitions {
            // Stable sort: rows sharing a date keep their input order
            rows.sort_by_key(|&idx| records[idx].date);

            let quantities: Vec<f64> = rows
                .iter()
                .map(|&idx| records[idx].quantity_used.unwrap_or(0.0))
                .collect();
            let values = self.model.forecast_history(&quantities)?;

            for (&idx, value) in rows.iter().zip(values) {
                forecasts[idx] = value;
            }
            debug!(item, rows = rows.len(), "item forecast computed");
        }

        Ok(records
            .iter()
            .zip(forecasts)
            .map(|(record, forecast)| ForecastRecord::from_usage(record, forecast))
            .collect())
    }

    /// Clean and forecast a usage table, keeping all of its columns
    ///
    /// The quantity column is replaced by its cleaned values, and the
    /// [`FORECAST_COLUMN`] and [`MISSING_FLAG_COLUMN`] columns are appended.
    /// Rows already flagged missing by an earlier run stay flagged.
    pub fn compute_table(
        &self,
        table: &UsageTable,
        mapping: &ColumnMapping,
    ) -> Result<ForecastTable> {
        let records = table.records(mapping)?;
        let mut forecasts = self.compute(&records)?;
        for (forecast, prior) in forecasts.iter_mut().zip(table.prior_missing_flags()?) {
            forecast.quantity_was_null |= prior;
        }

        let quantities: Vec<f64> = forecasts.iter().map(|f| f.quantity_used).collect();
        let values: Vec<f64> = forecasts.iter().map(|f| f.forecast_next_7_days).collect();
        let flags: Vec<bool> = forecasts.iter().map(|f| f.quantity_was_null).collect();

        let mut df = table.dataframe().clone();
        df.with_column(Series::new(mapping.quantity.as_str(), quantities))?;
        df.with_column(Series::new(FORECAST_COLUMN, values))?;
        df.with_column(Series::new(MISSING_FLAG_COLUMN, flags))?;

        ForecastTable::from_dataframe(df, mapping.clone())
    }
}

/// Forecast a usage table with the default seven-row trailing average
///
/// `date_col`, `item_col` and `qty_col` name the columns holding the date,
/// item identifier and quantity used. A `STOCK_REMAINING` column is carried
/// into the forecast records when the table has one.
pub fn compute_forecast(
    table: &UsageTable,
    date_col: &str,
    item_col: &str,
    qty_col: &str,
) -> Result<ForecastTable> {
    let mapping = ColumnMapping {
        date: date_col.to_string(),
        item: item_col.to_string(),
        quantity: qty_col.to_string(),
        ..ColumnMapping::default()
    }
    .stock_if_present(&table.column_names());
    ForecastEngine::<TrailingAverage>::default().compute_table(table, &mapping)
}
