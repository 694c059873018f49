//! Application configuration
//!
//! Sources are layered in this order, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. a TOML file (`aidops.toml` in the working directory unless a path is given)
//! 3. environment variables (`AIDOPS__<SECTION>__<KEY>`, e.g. `AIDOPS__COLUMNS__DATE`)

use crate::advisor::Sector;
use crate::coverage::DEFAULT_CRITICAL_DAYS;
use crate::data::ColumnMapping;
use crate::error::{ForecastError, Result};
use crate::models::moving_average::DEFAULT_WINDOW;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "aidops";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the CSV table store
    pub data_dir: PathBuf,
    /// Table the forecast reads usage history from
    pub input_table: String,
    /// Table the forecast results are written to
    pub result_table: String,
    /// Role granted read access to the results after each run
    pub grant_role: String,
    /// Column mapping of the input table
    pub columns: ColumnMapping,
    /// Rows averaged by the forecast
    pub window: usize,
    /// Program the deployment supports (`healthcare` or `education`)
    pub sector: String,
    pub scenario: ScenarioConfig,
    pub advisor: AdvisorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            input_table: "INVENTORY_HISTORY".to_string(),
            result_table: "FORECAST_RESULTS".to_string(),
            grant_role: "APP_PUBLIC".to_string(),
            columns: ColumnMapping::default(),
            window: DEFAULT_WINDOW,
            sector: "healthcare".to_string(),
            scenario: ScenarioConfig::default(),
            advisor: AdvisorConfig::default(),
        }
    }
}

/// Restock scenario parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Simulated shipment added to every item's stock
    pub restock_units: f64,
    /// Items with fewer days of cover are critical
    pub critical_days: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            restock_units: 0.0,
            critical_days: DEFAULT_CRITICAL_DAYS,
        }
    }
}

/// Completion models used for briefings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Models tried in order
    pub models: Vec<String>,
    /// External program answering prompts; `{model}` in an argument is
    /// replaced by the model name. Without one, briefings are built offline.
    pub command: Option<Vec<String>>,
    /// Rows of forecast context included in prompts
    pub context_rows: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            models: vec![
                "mistral-large".to_string(),
                "llama3-8b".to_string(),
                "gemma-7b".to_string(),
            ],
            command: None,
            context_rows: 20,
        }
    }
}

impl AppConfig {
    /// Load configuration, reading `path` if given or `aidops.toml` if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("AIDOPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(ForecastError::ConfigError(
                "window must be positive".to_string(),
            ));
        }
        if self.advisor.command.as_ref().map_or(false, |cmd| cmd.is_empty()) {
            return Err(ForecastError::ConfigError(
                "advisor.command must name a program".to_string(),
            ));
        }
        self.sector()?;
        Ok(())
    }

    /// Parsed sector
    pub fn sector(&self) -> Result<Sector> {
        self.sector.parse()
    }
}
