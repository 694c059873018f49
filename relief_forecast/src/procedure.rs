//! The forecast refresh procedure
//!
//! Reads a usage table from a store, computes the forecast, publishes it
//! under the result table name and re-grants read access. Published tables
//! always use the default column names, so readers need no mapping. The
//! result table is only written once the whole forecast has been computed,
//! so a failing run leaves the previous results in place.

use crate::audit::{audit_health, HealthSummary};
use crate::config::AppConfig;
use crate::data::{ColumnMapping, DataLoader, ForecastTable};
use crate::engine::ForecastEngine;
use crate::error::Result;
use crate::store::{normalize_table_name, TableStore};
use serde::Serialize;
use tracing::{info, warn};

/// Summary of a completed refresh
#[derive(Debug, Clone, Serialize)]
pub struct ProcedureOutcome {
    /// Table the results were written to
    pub result_table: String,
    /// Rows written
    pub rows: usize,
    /// Data quality of the input
    pub health: HealthSummary,
    pub message: String,
}

/// Refreshes the forecast result table
#[derive(Debug, Clone)]
pub struct ForecastProcedure {
    engine: ForecastEngine,
    result_table: String,
    grant_role: String,
}

impl ForecastProcedure {
    /// Create a procedure writing to `result_table` and granting `grant_role`
    pub fn new(window: usize, result_table: &str, grant_role: &str) -> Result<Self> {
        Ok(Self {
            engine: ForecastEngine::with_window(window)?,
            result_table: normalize_table_name(result_table)?,
            grant_role: grant_role.to_string(),
        })
    }

    /// Create a procedure from the application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.window, &config.result_table, &config.grant_role)
    }

    /// Name of the table results are written to
    pub fn result_table(&self) -> &str {
        &self.result_table
    }

    /// Compute the forecast for `input_table` and publish it
    pub fn run<S: TableStore + ?Sized>(
        &self,
        store: &mut S,
        input_table: &str,
        mapping: &ColumnMapping,
    ) -> Result<ProcedureOutcome> {
        let usage = DataLoader::from_dataframe(store.read_table(input_table)?);
        let forecast = self.engine.compute_table(&usage, mapping)?;
        let health = audit_health(&forecast.records()?);

        if !health.is_clean() {
            warn!(
                null_quantities = health.null_quantity_count,
                negative_stock = health.negative_stock_count,
                "input table has data quality issues; missing quantities were treated as zero"
            );
        }

        let rows = forecast.len();
        let mut df = forecast.into_canonical()?.into_dataframe();
        store.overwrite_table(&self.result_table, &mut df)?;
        // Overwriting drops grants, so readers must be granted again
        store.grant_select(&self.result_table, &self.grant_role)?;

        info!(
            input = input_table,
            output = %self.result_table,
            rows,
            "forecast published"
        );

        Ok(ProcedureOutcome {
            result_table: self.result_table.clone(),
            rows,
            health,
            message: format!("Success: Forecast generated in {}", self.result_table),
        })
    }

    /// Read back the published forecast
    ///
    /// Results are stored under the default column names, whatever mapping
    /// the input table was read with.
    pub fn load_results<S: TableStore + ?Sized>(&self, store: &S) -> Result<ForecastTable> {
        let df = store.read_table(&self.result_table)?;
        let names: Vec<&str> = df.get_column_names();
        let mapping = ColumnMapping::default().stock_if_present(&names);
        ForecastTable::from_dataframe(df, mapping)
    }
}
