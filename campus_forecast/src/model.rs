//! Data model shared by the series builder, the service and the stores

use crate::rules::SeriesType;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CollegeId = u64;
pub type OwnerId = u64;
pub type PredictionId = u64;

/// Time bucketing of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Yearly,
    Monthly,
    Weekly,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Yearly
    }
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Yearly => "yearly",
            Granularity::Monthly => "monthly",
            Granularity::Weekly => "weekly",
        }
    }

    /// Display label for a period: `2024`, `2024-03` or `Week 12 - 2024`
    pub fn label(&self, period: NaiveDate) -> String {
        match self {
            Granularity::Yearly => period.format("%Y").to_string(),
            Granularity::Monthly => period.format("%Y-%m").to_string(),
            Granularity::Weekly => {
                let week = period.iso_week();
                format!("Week {} - {}", week.week(), week.year())
            }
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantity a stored-data forecast is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Expenses,
    Profit,
    Students,
}

/// Granularities each metric can be built at.
///
/// Students are only recorded per year and expenses only per month; revenue
/// can be apportioned evenly across months.
const SUPPORTED_GRANULARITIES: [(Metric, &[Granularity]); 4] = [
    (Metric::Revenue, &[Granularity::Yearly, Granularity::Monthly]),
    (Metric::Expenses, &[Granularity::Monthly]),
    (Metric::Profit, &[Granularity::Yearly, Granularity::Monthly]),
    (Metric::Students, &[Granularity::Yearly]),
];

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Expenses => "expenses",
            Metric::Profit => "profit",
            Metric::Students => "students",
        }
    }

    pub fn granularities(&self) -> &'static [Granularity] {
        SUPPORTED_GRANULARITIES
            .iter()
            .find(|(metric, _)| metric == self)
            .map(|(_, granularities)| *granularities)
            .unwrap_or(&[])
    }

    pub fn supports(&self, granularity: Granularity) -> bool {
        self.granularities().contains(&granularity)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity, or aggregate of entities, a series is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope_type", content = "scope_id", rename_all = "snake_case")]
pub enum Scope {
    /// A single college
    College(CollegeId),
    /// Every college combined
    University,
}

impl Scope {
    pub fn scope_type(&self) -> &'static str {
        match self {
            Scope::College(_) => "college",
            Scope::University => "university",
        }
    }

    pub fn college_id(&self) -> Option<CollegeId> {
        match self {
            Scope::College(id) => Some(*id),
            Scope::University => None,
        }
    }
}

/// A college with optional capacity ceilings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct College {
    pub id: CollegeId,
    pub name: String,
    pub max_students_capacity: Option<u32>,
    pub max_annual_revenue: Option<f64>,
}

impl College {
    pub fn new(id: CollegeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            max_students_capacity: None,
            max_annual_revenue: None,
        }
    }

    pub fn with_capacity(mut self, max_students: u32) -> Self {
        self.max_students_capacity = Some(max_students);
        self
    }

    pub fn with_max_revenue(mut self, max_annual_revenue: f64) -> Self {
        self.max_annual_revenue = Some(max_annual_revenue);
        self
    }
}

/// Yearly revenue and enrolment for one college; unique per (college, year)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStat {
    pub college_id: CollegeId,
    pub year: i32,
    pub annual_revenue: Option<f64>,
    pub annual_students: Option<u32>,
}

/// One expense entry; a month may hold several
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthExpense {
    pub college_id: CollegeId,
    pub year: i32,
    pub month: u32,
    pub expenses: f64,
    pub description: Option<String>,
}

/// Where a prediction's observations come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PredictionSource {
    /// Built from stored college data, clamped to domain bounds
    Stored { scope: Scope, metric: Metric },
    /// Points supplied by the caller, checked against a series type rule
    Manual { series_type: SeriesType },
}

/// A forecast request and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: PredictionId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub source: PredictionSource,
    pub granularity: Granularity,
    pub future_steps: usize,
    /// Earliest observed period
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One historical point; indices are contiguous from 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub index: usize,
    pub value: f64,
    pub period: NaiveDate,
}

/// One derived future point; indices continue after the last observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub index: usize,
    pub predicted_value: f64,
    pub period: NaiveDate,
}

/// A prediction with its children, persisted as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction: Prediction,
    pub observations: Vec<Observation>,
    pub forecasts: Vec<ForecastPoint>,
}

/// A caller-supplied historical point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputPoint {
    pub value: f64,
    pub period: NaiveDate,
}

impl InputPoint {
    pub fn new(value: f64, period: NaiveDate) -> Self {
        Self { value, period }
    }
}

/// A (period, value) pair produced by the series builder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: NaiveDate,
    pub value: f64,
}

/// A forecast point ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub label: String,
    pub date: NaiveDate,
    pub value: f64,
}

/// Everything a caller gets back from the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub prediction: Prediction,
    pub observations: Vec<Observation>,
    pub forecasts: Vec<ForecastPoint>,
    pub labeled: Vec<LabeledPoint>,
}

impl PredictionReport {
    pub fn from_record(record: PredictionRecord) -> Self {
        let granularity = record.prediction.granularity;
        let labeled = record
            .forecasts
            .iter()
            .map(|point| LabeledPoint {
                label: granularity.label(point.period),
                date: point.period,
                value: point.predicted_value,
            })
            .collect();

        Self {
            prediction: record.prediction,
            observations: record.observations,
            forecasts: record.forecasts,
            labeled,
        }
    }
}

/// Input for creating a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum PredictionInput {
    /// Build the series from stored college data
    Stored { scope: Scope, metric: Metric },
    /// Use the supplied points directly
    Points {
        series_type: SeriesType,
        points: Vec<InputPoint>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePrediction {
    pub title: String,
    pub description: Option<String>,
    pub granularity: Granularity,
    /// Falls back to the configured default when absent
    pub future_steps: Option<usize>,
    pub input: PredictionInput,
}

/// Changes to an existing prediction; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePrediction {
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub granularity: Option<Granularity>,
    pub future_steps: Option<usize>,
    /// Replacement series for manual predictions
    pub points: Option<Vec<InputPoint>>,
    /// Regenerate forecasts even when nothing numeric changed
    #[serde(default)]
    pub refresh: bool,
}
