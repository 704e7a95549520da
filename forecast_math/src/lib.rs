//! # Forecast Math
//!
//! Numeric building blocks for forecasting short historical series.
//! This crate provides the window classifier and the step-wise
//! extrapolator used by the campus forecasting engine.
//!
//! ```
//! use forecast_math::{extrapolate, classify, Trend};
//!
//! assert_eq!(classify(&[10.0, 20.0, 30.0, 40.0]), Trend::Monotonic);
//! assert_eq!(extrapolate(&[10.0, 20.0, 30.0, 40.0], 2).unwrap(), vec![50.0, 60.0]);
//! ```

use thiserror::Error;

pub mod extrapolate;
pub mod series;
pub mod trend;

pub use crate::extrapolate::{extrapolate, Extrapolator};
pub use crate::trend::{classify, Trend};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
