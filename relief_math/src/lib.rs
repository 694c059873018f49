//! # Relief Math
//!
//! Numeric building blocks for relief supply forecasting.
//! This crate provides the windowed averages the forecast engine is built on.

use thiserror::Error;

pub mod moving_averages;

pub use moving_averages::{trailing_means, TrailingMean};

/// Errors that can occur in forecasting calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for relief math operations
pub type Result<T> = std::result::Result<T, MathError>;
