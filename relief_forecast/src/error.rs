//! Error types for the relief_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the relief_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required column is missing from the input
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A value could not be interpreted as the type its column requires
    #[error("Type mismatch in column '{column}' at row {row}: {value:?}")]
    TypeMismatch {
        column: String,
        row: usize,
        value: String,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The table store has no table with this name
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A completion provider failed to answer
    #[error("Completion error: {0}")]
    CompletionError(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from the math crate
    #[error("Math error: {0}")]
    MathError(#[from] relief_math::MathError),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        match err {
            PolarsError::ColumnNotFound(name) => ForecastError::SchemaError(format!(
                "column '{}' not found",
                name
            )),
            other => ForecastError::PolarsError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::JsonError(err.to_string())
    }
}

impl From<config::ConfigError> for ForecastError {
    fn from(err: config::ConfigError) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
