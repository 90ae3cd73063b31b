//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use fincoach_core::models::DateRange;

pub mod analytics;
pub mod bank;
pub mod budgets;
pub mod chat;
pub mod data;
pub mod goals;
pub mod plaid;
pub mod transactions;

// Re-export all handlers for use in router
pub use analytics::*;
pub use bank::*;
pub use budgets::*;
pub use chat::*;
pub use data::*;
pub use goals::*;
pub use plaid::*;
pub use transactions::*;

/// Optional date bounds shared by the report endpoints
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RangeQuery {
    /// Explicit bounds, each defaulting to the current month's edge
    pub fn or_month_of(&self, today: NaiveDate) -> DateRange {
        let month = DateRange::month_of(today);
        DateRange::new(
            self.start_date.unwrap_or(month.start),
            self.end_date.unwrap_or(month.end),
        )
    }

    /// `None` when neither bound was given
    pub fn explicit(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (None, None) => None,
            (start, end) => Some(DateRange::new(
                start.unwrap_or(earliest()),
                end.unwrap_or(latest()),
            )),
        }
    }
}

// Four-digit years keep the stored text dates comparable
fn earliest() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default()
}

fn latest() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or_default()
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
