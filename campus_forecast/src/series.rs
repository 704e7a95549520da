//! Assembly of historical series from stored college data
//!
//! Raw year and expense rows are turned into one value per period,
//! ascending by period. Contributions of several colleges to the same
//! period are summed. Periods with no contributing data are left out
//! rather than filled with zero.
//!
//! Yearly periods are dated `YYYY-01-01`, monthly ones `YYYY-MM-01`.
//! Annual revenue is spread evenly over the twelve months of its year
//! when a monthly series is requested.

use crate::error::Result;
use crate::model::{CollegeId, Granularity, Metric, MonthExpense, Scope, SeriesPoint, YearStat};
use crate::store::StatsSource;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

const MONTHS_PER_YEAR: u32 = 12;

/// Builds series from a [`StatsSource`]
#[derive(Debug)]
pub struct SeriesBuilder<'a, S: StatsSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: StatsSource + ?Sized> SeriesBuilder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Series for `metric` over `scope` at `granularity`.
    ///
    /// The combination is expected to be valid already; an unsupported
    /// one yields an empty series.
    pub fn build(
        &self,
        scope: Scope,
        metric: Metric,
        granularity: Granularity,
    ) -> Result<Vec<SeriesPoint>> {
        let college = scope.college_id();

        let contributions = match (metric, granularity) {
            (Metric::Revenue, Granularity::Yearly) => {
                yearly_revenue(&self.source.year_stats(college)?)
            }
            (Metric::Revenue, Granularity::Monthly) => {
                apportion_monthly(&yearly_revenue(&self.source.year_stats(college)?))
            }
            (Metric::Students, Granularity::Yearly) => {
                yearly_students(&self.source.year_stats(college)?)
            }
            (Metric::Expenses, Granularity::Monthly) => {
                monthly_expenses(&self.source.month_expenses(college)?)
            }
            (Metric::Profit, Granularity::Yearly) => {
                let revenue = yearly_revenue(&self.source.year_stats(college)?);
                let expenses = yearly_expenses(&self.source.month_expenses(college)?);
                profit(&revenue, &expenses)
            }
            (Metric::Profit, Granularity::Monthly) => {
                let revenue = apportion_monthly(&yearly_revenue(&self.source.year_stats(college)?));
                let expenses = monthly_expenses(&self.source.month_expenses(college)?);
                profit(&revenue, &expenses)
            }
            _ => {
                log::debug!(
                    "No series for {} at {} granularity",
                    metric,
                    granularity
                );
                BTreeMap::new()
            }
        };

        Ok(sum_by_period(contributions))
    }
}

/// Per-college values keyed by (college, period)
type Contributions = BTreeMap<(CollegeId, NaiveDate), f64>;

fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn yearly_revenue(rows: &[YearStat]) -> Contributions {
    let mut out = Contributions::new();
    for row in rows {
        if let (Some(revenue), Some(period)) = (row.annual_revenue, year_start(row.year)) {
            *out.entry((row.college_id, period)).or_insert(0.0) += revenue;
        }
    }
    out
}

fn yearly_students(rows: &[YearStat]) -> Contributions {
    let mut out = Contributions::new();
    for row in rows {
        if let (Some(students), Some(period)) = (row.annual_students, year_start(row.year)) {
            *out.entry((row.college_id, period)).or_insert(0.0) += f64::from(students);
        }
    }
    out
}

/// Spread each yearly value across the months of its year
fn apportion_monthly(yearly: &Contributions) -> Contributions {
    let mut out = Contributions::new();
    for (&(college_id, year), &value) in yearly {
        let share = value / f64::from(MONTHS_PER_YEAR);
        for month in 1..=MONTHS_PER_YEAR {
            if let Some(period) = month_start(year.year(), month) {
                *out.entry((college_id, period)).or_insert(0.0) += share;
            }
        }
    }
    out
}

fn monthly_expenses(rows: &[MonthExpense]) -> Contributions {
    let mut out = Contributions::new();
    for row in rows {
        match month_start(row.year, row.month) {
            Some(period) => *out.entry((row.college_id, period)).or_insert(0.0) += row.expenses,
            None => log::warn!(
                "Skipping expense row for college {} with invalid month {}-{}",
                row.college_id,
                row.year,
                row.month
            ),
        }
    }
    out
}

fn yearly_expenses(rows: &[MonthExpense]) -> Contributions {
    let mut out = Contributions::new();
    for row in rows {
        if month_start(row.year, row.month).is_none() {
            continue;
        }
        if let Some(period) = year_start(row.year) {
            *out.entry((row.college_id, period)).or_insert(0.0) += row.expenses;
        }
    }
    out
}

/// Revenue minus expenses where a college has both for the period
fn profit(revenue: &Contributions, expenses: &Contributions) -> Contributions {
    revenue
        .iter()
        .filter_map(|(key, income)| expenses.get(key).map(|spent| (*key, income - spent)))
        .collect()
}

fn sum_by_period(contributions: Contributions) -> Vec<SeriesPoint> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for ((_, period), value) in contributions {
        *totals.entry(period).or_insert(0.0) += value;
    }
    totals
        .into_iter()
        .map(|(period, value)| SeriesPoint { period, value })
        .collect()
}
