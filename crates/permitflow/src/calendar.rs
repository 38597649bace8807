//! Business-day arithmetic for submission scheduling.
//!
//! Weekends are the only non-working days. Public-holiday calendars differ
//! per jurisdiction and are settled upstream of this crate.

use chrono::{Datelike, NaiveDate, Weekday};

/// Returns true when the date falls on Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts business days between `start` and `end`, both endpoints inclusive.
/// Returns 0 when `end` precedes `start`.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    let mut count = 0;
    let mut cursor = start;
    while cursor <= end {
        if is_business_day(cursor) {
            count += 1;
        }
        cursor = match cursor.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    count
}

/// Walks forward from `start` until `business_days` working days have
/// elapsed, skipping weekends. The start date itself is not counted, so a
/// Monday start plus five business days lands on the following Monday.
pub fn project_completion_date(start: NaiveDate, business_days: u32) -> NaiveDate {
    let mut remaining = business_days;
    let mut cursor = start;
    while remaining > 0 {
        cursor = match cursor.succ_opt() {
            Some(next) => next,
            None => return cursor,
        };
        if is_business_day(cursor) {
            remaining -= 1;
        }
    }

    cursor
}
