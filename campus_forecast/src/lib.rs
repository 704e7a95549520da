//! # Campus Forecast
//!
//! A forecasting engine for college financial and enrolment data.
//!
//! ## Features
//!
//! - Series assembly from stored yearly stats and monthly expenses
//!   (revenue, expenses, profit and student counts)
//! - Step-wise extrapolation that follows a trend or falls back to the
//!   window mean
//! - Domain bounds: non-negative quantities and per-college capacity ceilings
//! - Value rules for caller-supplied series
//! - Prediction records with observations, forecast points and display labels
//!
//! ## Quick Start
//!
//! ```rust
//! use campus_forecast::calendar::FixedCalendar;
//! use campus_forecast::model::{College, CreatePrediction, Granularity, Metric, PredictionInput, Scope, YearStat};
//! use campus_forecast::store::{InMemoryPredictionStore, InMemoryStats};
//! use campus_forecast::{EngineConfig, PredictionService};
//! use chrono::NaiveDate;
//!
//! let stats = InMemoryStats::new();
//! stats.add_college(College::new(1, "Engineering").with_capacity(500))?;
//! for (year, students) in [(2021, 300), (2022, 340), (2023, 380)] {
//!     stats.upsert_year_stat(YearStat {
//!         college_id: 1,
//!         year,
//!         annual_revenue: None,
//!         annual_students: Some(students),
//!     })?;
//! }
//!
//! let service = PredictionService::new(
//!     InMemoryPredictionStore::new(),
//!     stats,
//!     FixedCalendar::at_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
//!     EngineConfig::default(),
//! )?;
//!
//! let report = service.create(
//!     42,
//!     CreatePrediction {
//!         title: "Enrolment outlook".to_string(),
//!         description: None,
//!         granularity: Granularity::Yearly,
//!         future_steps: Some(4),
//!         input: PredictionInput::Stored {
//!             scope: Scope::College(1),
//!             metric: Metric::Students,
//!         },
//!     },
//! )?;
//!
//! let values: Vec<f64> = report.forecasts.iter().map(|p| p.predicted_value).collect();
//! assert_eq!(values, vec![420.0, 460.0, 500.0, 500.0]);
//! assert_eq!(report.labeled[0].label, "2024");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bounds;
pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod rules;
pub mod series;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use crate::config::EngineConfig;
pub use crate::data::DataLoader;
pub use crate::error::{ForecastError, Result, ValidationErrors};
pub use crate::series::SeriesBuilder;
pub use crate::service::PredictionService;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
