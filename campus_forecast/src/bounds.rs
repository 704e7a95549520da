//! Domain limits applied to predictions built from stored data

use crate::model::{College, Granularity, Metric};
use forecast_math::series::round2;

/// Lower and upper limit for one metric in one scope
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
}

impl Bounds {
    /// Apply the floor, then the ceiling
    pub fn clamp(&self, value: f64) -> f64 {
        let mut clamped = value;
        if let Some(floor) = self.floor {
            clamped = clamped.max(floor);
        }
        if let Some(ceiling) = self.ceiling {
            clamped = clamped.min(ceiling);
        }
        clamped
    }
}

/// Metrics that can never drop below zero
const NON_NEGATIVE: [Metric; 3] = [Metric::Revenue, Metric::Expenses, Metric::Students];

/// Limits for `metric` at `granularity`, with `college` for single-college scopes.
///
/// Aggregate scopes pass `None` and get no ceiling. The annual revenue
/// ceiling is split across months for monthly series.
pub fn bounds_for(metric: Metric, granularity: Granularity, college: Option<&College>) -> Bounds {
    let floor = NON_NEGATIVE.contains(&metric).then_some(0.0);

    let ceiling = college.and_then(|college| match metric {
        Metric::Students => college.max_students_capacity.map(f64::from),
        Metric::Revenue => college.max_annual_revenue.map(|max| match granularity {
            Granularity::Yearly => max,
            Granularity::Monthly => max / 12.0,
            Granularity::Weekly => max / 52.0,
        }),
        Metric::Expenses | Metric::Profit => None,
    });

    Bounds { floor, ceiling }
}

/// Clamp one predicted value, keeping two-decimal precision
pub fn clamp(metric: Metric, granularity: Granularity, college: Option<&College>, value: f64) -> f64 {
    let bounds = bounds_for(metric, granularity, college);
    let clamped = round2(bounds.clamp(value));
    if clamped != value {
        log::debug!("Clamped {} prediction {} to {}", metric, value, clamped);
    }
    clamped
}
