//! Clock and calendar arithmetic
//!
//! Forecast periods are derived by advancing the last observed period.
//! Month and year steps use calendar-aware addition, so a step from
//! 31 January lands on the last day of February.

use crate::model::Granularity;
use chrono::{DateTime, Days, Months, NaiveDate, Utc};

/// Source of the current time and period arithmetic
pub trait Calendar: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// `date` moved forward by `steps` units of `granularity`
    fn advance(&self, date: NaiveDate, granularity: Granularity, steps: u32) -> Option<NaiveDate> {
        advance_date(date, granularity, steps)
    }
}

/// Calendar backed by the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCalendar;

impl Calendar for SystemCalendar {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Calendar pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedCalendar {
    now: DateTime<Utc>,
}

impl FixedCalendar {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Midnight UTC on the given date
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Calendar for FixedCalendar {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Calendar-aware period addition; `None` when the result is out of range
pub fn advance_date(date: NaiveDate, granularity: Granularity, steps: u32) -> Option<NaiveDate> {
    match granularity {
        Granularity::Yearly => date.checked_add_months(Months::new(steps.checked_mul(12)?)),
        Granularity::Monthly => date.checked_add_months(Months::new(steps)),
        Granularity::Weekly => date.checked_add_days(Days::new(u64::from(steps) * 7)),
    }
}
