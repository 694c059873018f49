//! # Relief Forecast
//!
//! Demand forecasting and data health auditing for relief supply inventories.
//!
//! ## Features
//!
//! - Usage table loading from CSV with caller-chosen column names
//! - Seven-day trailing moving average forecast, per item
//! - Data health audit (missing quantities, negative stock)
//! - Stock coverage and restock scenarios
//! - Table store with overwrite semantics and read grants
//! - Briefings from a cascade of completion models with an offline fallback
//!
//! ## Forecasting
//!
//! Missing quantities are treated as zero usage; this is a guaranteed
//! transformation, not an error. Each row's forecast is the mean of its own
//! quantity and those of up to six preceding rows of the same item, ordered
//! by date. The first rows of an item average over the rows seen so far.
//!
//! ## Quick Start
//!
//! ```no_run
//! use relief_forecast::audit::audit_health;
//! use relief_forecast::data::DataLoader;
//! use relief_forecast::engine::compute_forecast;
//!
//! let usage = DataLoader::from_csv("inventory_history.csv")?;
//! let forecast = compute_forecast(&usage, "DATE", "ITEM_NAME", "QUANTITY_USED")?;
//!
//! let health = audit_health(&forecast.records()?);
//! println!("{} rows, {} missing quantities", health.rows, health.null_quantity_count);
//! # Ok::<(), relief_forecast::ForecastError>(())
//! ```

pub mod advisor;
pub mod audit;
pub mod config;
pub mod coverage;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod procedure;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use crate::audit::HealthSummary;
pub use crate::config::AppConfig;
pub use crate::data::{ColumnMapping, DataLoader, ForecastRecord, ForecastTable, UsageRecord, UsageTable};
pub use crate::engine::{compute_forecast, ForecastEngine};
pub use crate::error::ForecastError;
pub use crate::models::DemandModel;
pub use crate::procedure::{ForecastProcedure, ProcedureOutcome};
pub use crate::store::{CsvDirectoryStore, MemoryStore, TableStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
