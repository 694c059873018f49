//! # AidOps
//!
//! `aid_ops_workspace` ties the AidOps crates together: [`math`] holds the
//! windowed statistics and [`forecast`] the usage tables, forecast engine,
//! data health audit and table store built on top of them.
//!
//! ## Example
//!
//! ```
//! use aid_ops_workspace::prelude::*;
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let records = vec![
//!     UsageRecord::new("Bandages", day(1), Some(10.0), Some(90.0)),
//!     UsageRecord::new("Bandages", day(2), None, Some(-5.0)),
//! ];
//!
//! let forecast = ForecastEngine::<TrailingAverage>::default().compute(&records)?;
//! assert_eq!(forecast[1].forecast_next_7_days, 5.0);
//!
//! let health = audit_health(&forecast);
//! assert_eq!((health.null_quantity_count, health.negative_stock_count), (1, 1));
//! # Ok::<(), ForecastError>(())
//! ```

pub use relief_forecast as forecast;
pub use relief_math as math;

/// The types most callers need
pub mod prelude {
    pub use relief_forecast::audit::{audit_health, audit_usage, HealthSummary};
    pub use relief_forecast::coverage::CoverageReport;
    pub use relief_forecast::data::{ColumnMapping, ForecastRecord, UsageRecord, UsageTable};
    pub use relief_forecast::engine::{compute_forecast, ForecastEngine};
    pub use relief_forecast::models::TrailingAverage;
    pub use relief_forecast::procedure::ForecastProcedure;
    pub use relief_forecast::store::{MemoryStore, TableStore};
    pub use relief_forecast::ForecastError;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use chrono::NaiveDate;

    #[test]
    fn test_refresh_through_memory_store() {
        let records: Vec<UsageRecord> = (1..=3)
            .map(|d| {
                UsageRecord::new(
                    "Paracetamol",
                    NaiveDate::from_ymd_opt(2024, 2, d).unwrap(),
                    Some(d as f64 * 3.0),
                    Some(100.0),
                )
            })
            .collect();
        let mapping = ColumnMapping::default();
        let mut df = UsageTable::from_records(&records, &mapping)
            .unwrap()
            .dataframe()
            .clone();

        let mut store = MemoryStore::new();
        store.overwrite_table("INVENTORY_HISTORY", &mut df).unwrap();

        let procedure = ForecastProcedure::new(7, "FORECAST_RESULTS", "APP_PUBLIC").unwrap();
        let outcome = procedure.run(&mut store, "INVENTORY_HISTORY", &mapping).unwrap();
        assert_eq!(outcome.rows, 3);
        assert!(outcome.health.is_clean());

        let forecast = procedure.load_results(&store).unwrap();
        let last = forecast.records().unwrap().pop().unwrap();
        assert_eq!(last.forecast_next_7_days, 6.0);
    }

    #[test]
    fn test_math_reexport() {
        assert_eq!(
            crate::math::trailing_means(&[2.0, 4.0], 7).unwrap(),
            vec![2.0, 3.0]
        );
    }
}
