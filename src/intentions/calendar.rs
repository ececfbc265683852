//! Month and day helpers for the intentions editor.
//!
//! All functions are pure. Invalid months (outside 1-12) yield `None`.

use chrono::{Datelike, Locale, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::validate::parse_date;

/// Number of days in a month, accounting for leap years.
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

/// First and last day of a month as `YYYY-MM-DD` strings.
#[must_use]
pub fn month_bounds(year: i32, month: u32) -> Option<(String, String)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, last_day_of_month(year, month)?)?;
    Some((
        first.format("%Y-%m-%d").to_string(),
        last.format("%Y-%m-%d").to_string(),
    ))
}

/// Today's day-of-month placed in the target month, clamped to its last day.
///
/// `clamp_to_month(2025-03-31, 2025, 2)` is `2025-02-28`.
#[must_use]
pub fn clamp_to_month(today: NaiveDate, year: i32, month: u32) -> Option<NaiveDate> {
    let day = today.day().min(last_day_of_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whether a `YYYY-MM-DD` string names a day inside the month.
#[must_use]
pub fn date_in_month(date: &str, year: i32, month: u32) -> bool {
    parse_date(date.trim()).is_some_and(|d| d.year() == year && d.month() == month)
}

/// Localized label such as "Sunday, 4 January".
#[must_use]
pub fn format_day_label(date: NaiveDate, locale: Locale) -> String {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
        .format_localized("%A, %-d %B", locale)
        .to_string()
}

/// Localized month name.
#[must_use]
pub fn month_name(month: u32, locale: Locale) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(2000, month, 1)?;
    Some(
        Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
            .format_localized("%B", locale)
            .to_string(),
    )
}
