//! Calendar helpers for month windows and date differences
//!
//! Every computation that depends on "now" takes `today` explicitly; callers
//! pass `Utc::now().date_naive()`.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::DateRange;

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

pub fn days_in_month(date: NaiveDate) -> i64 {
    (month_end(date) - month_start(date)).num_days() + 1
}

/// Shift a date by whole months, clamping the day to the target month's length
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Signed whole days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Signed number of full calendar months from `from` to `to`, truncated
/// toward zero. A month only counts once the day-of-month is reached.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let mut months = (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64
        - from.month() as i64;
    if months > 0 && to.day() < from.day() && !is_month_end_clamp(from, to) {
        months -= 1;
    } else if months < 0 && to.day() > from.day() && !is_month_end_clamp(to, from) {
        months += 1;
    }
    months
}

/// True when `later` sits on the last day of its month and `earlier`'s day
/// does not exist there (Jan 31 -> Feb 28 counts as a full month).
fn is_month_end_clamp(earlier: NaiveDate, later: NaiveDate) -> bool {
    later == month_end(later) && earlier.day() > later.day()
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The calendar month containing `date`
    pub fn month_of(date: NaiveDate) -> Self {
        Self::new(month_start(date), month_end(date))
    }

    /// `days` days back from `today` through `today`
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        Self::new(today - Duration::days(days), today)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}
