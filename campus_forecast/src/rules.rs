//! Value rules for caller-supplied series
//!
//! Each [`SeriesType`] maps to one [`ValueRule`] through a fixed table.
//! Every point is checked against its rule and all failures are reported
//! together.

use crate::model::InputPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical label for a caller-supplied series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesType {
    Generic,
    StudentPerformance,
    Headcount,
    Revenue,
    Percentage,
    Temperature,
}

impl Default for SeriesType {
    fn default() -> Self {
        SeriesType::Generic
    }
}

/// Numeric constraint applied to every point of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRule {
    pub integer: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allow_negative: bool,
}

impl ValueRule {
    pub const UNRESTRICTED: ValueRule = ValueRule {
        integer: false,
        min: None,
        max: None,
        allow_negative: true,
    };

    /// First rule the value breaks, if any
    pub fn check(&self, value: f64) -> Option<RuleViolation> {
        if !value.is_finite() {
            return Some(RuleViolation::NotFinite);
        }
        if !self.allow_negative && value < 0.0 {
            return Some(RuleViolation::Negative);
        }
        if self.integer && value.fract() != 0.0 {
            return Some(RuleViolation::NotInteger);
        }
        if let Some(min) = self.min {
            if value < min {
                return Some(RuleViolation::BelowMin(min));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Some(RuleViolation::AboveMax(max));
            }
        }
        None
    }
}

const SERIES_RULES: [(SeriesType, ValueRule); 6] = [
    (SeriesType::Generic, ValueRule::UNRESTRICTED),
    (
        SeriesType::StudentPerformance,
        ValueRule {
            integer: false,
            min: Some(0.0),
            max: Some(100.0),
            allow_negative: false,
        },
    ),
    (
        SeriesType::Headcount,
        ValueRule {
            integer: true,
            min: None,
            max: None,
            allow_negative: false,
        },
    ),
    (
        SeriesType::Revenue,
        ValueRule {
            integer: false,
            min: None,
            max: None,
            allow_negative: false,
        },
    ),
    (
        SeriesType::Percentage,
        ValueRule {
            integer: false,
            min: Some(0.0),
            max: Some(100.0),
            allow_negative: false,
        },
    ),
    (
        SeriesType::Temperature,
        ValueRule {
            integer: false,
            min: Some(-100.0),
            max: Some(100.0),
            allow_negative: true,
        },
    ),
];

impl SeriesType {
    pub fn rule(&self) -> ValueRule {
        SERIES_RULES
            .iter()
            .find(|(series_type, _)| series_type == self)
            .map(|(_, rule)| *rule)
            .unwrap_or(ValueRule::UNRESTRICTED)
    }
}

/// Which part of a rule a value failed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "limit", rename_all = "snake_case")]
pub enum RuleViolation {
    NotFinite,
    Negative,
    NotInteger,
    BelowMin(f64),
    AboveMax(f64),
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleViolation::NotFinite => write!(f, "must be a finite number"),
            RuleViolation::Negative => write!(f, "must not be negative"),
            RuleViolation::NotInteger => write!(f, "must be a whole number"),
            RuleViolation::BelowMin(min) => write!(f, "must be at least {}", min),
            RuleViolation::AboveMax(max) => write!(f, "must be at most {}", max),
        }
    }
}

/// A failing point; `index` is its 1-based position after sorting by period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointViolation {
    pub index: usize,
    pub value: f64,
    pub violation: RuleViolation,
}

impl fmt::Display for PointViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point {} ({}) {}", self.index, self.value, self.violation)
    }
}

/// Check already-sorted points against the series type's rule
pub fn check_points(series_type: SeriesType, points: &[InputPoint]) -> Vec<PointViolation> {
    let rule = series_type.rule();
    points
        .iter()
        .enumerate()
        .filter_map(|(position, point)| {
            rule.check(point.value).map(|violation| PointViolation {
                index: position + 1,
                value: point.value,
                violation,
            })
        })
        .collect()
}
