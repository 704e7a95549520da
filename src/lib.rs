//! # Campus Insights
//!
//! `campus_insights` bundles the series math and the prediction engine used
//! to forecast college revenue, expenses, profit and enrolment.
//!
//! ## Example
//!
//! ```
//! use campus_insights::campus_forecast::calendar::FixedCalendar;
//! use campus_insights::campus_forecast::model::{CreatePrediction, Granularity, InputPoint, PredictionInput};
//! use campus_insights::campus_forecast::rules::SeriesType;
//! use campus_insights::campus_forecast::store::{InMemoryPredictionStore, InMemoryStats};
//! use campus_insights::campus_forecast::{EngineConfig, PredictionService};
//! use chrono::NaiveDate;
//!
//! let service = PredictionService::new(
//!     InMemoryPredictionStore::new(),
//!     InMemoryStats::new(),
//!     FixedCalendar::at_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! let points = vec![
//!     InputPoint::new(18.0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
//!     InputPoint::new(21.0, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
//! ];
//! let report = service
//!     .create(
//!         7,
//!         CreatePrediction {
//!             title: "Lab temperature".to_string(),
//!             description: None,
//!             granularity: Granularity::Monthly,
//!             future_steps: Some(2),
//!             input: PredictionInput::Points {
//!                 series_type: SeriesType::Temperature,
//!                 points,
//!             },
//!         },
//!     )
//!     .unwrap();
//!
//! assert_eq!(report.forecasts[0].predicted_value, 24.0);
//! assert_eq!(report.forecasts[1].predicted_value, 27.0);
//! assert_eq!(report.labeled[1].label, "2024-04");
//! ```

pub use campus_forecast;
pub use forecast_math;

/// Extrapolate a bare series without building a prediction record.
///
/// # Examples
///
/// ```
/// let values = campus_insights::project(&[5.0, 7.0], 2).unwrap();
/// assert_eq!(values, vec![9.0, 11.0]);
/// ```
pub fn project(seed: &[f64], steps: usize) -> forecast_math::Result<Vec<f64>> {
    forecast_math::Extrapolator::new(seed)?.project(steps)
}
