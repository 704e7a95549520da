//! Error types for the campus_forecast crate

use crate::model::{Granularity, Metric, PredictionId};
use crate::rules::PointViolation;
use crate::store::StoreError;
use forecast_math::MathError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Structured per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for one field
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ForecastError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Custom error types for the campus_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series is shorter than the configured minimum
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The metric cannot be bucketed at the requested granularity
    #[error("Invalid combination: {metric} is not available {granularity}")]
    InvalidCombination {
        metric: Metric,
        granularity: Granularity,
    },

    /// One or more supplied points break the series type's rule
    #[error("Value constraint violation: {}", format_violations(.0))]
    ValueConstraintViolation(Vec<PointViolation>),

    /// Request fields failed validation
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Missing prediction, or one owned by someone else
    #[error("Prediction {id} not found")]
    NotFound { id: PredictionId },

    /// Malformed input data
    #[error("Data error: {0}")]
    DataError(String),

    /// Bad engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unexpected failure while computing or persisting
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

fn format_violations(violations: &[PointViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ForecastError {
    /// Whether this error is an unexpected failure rather than a domain error
    pub fn is_internal(&self) -> bool {
        matches!(self, ForecastError::Internal(_) | ForecastError::IoError(_))
    }
}

impl From<StoreError> for ForecastError {
    fn from(err: StoreError) -> Self {
        ForecastError::Internal(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::Internal(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::InvalidConfig(err.to_string())
    }
}
