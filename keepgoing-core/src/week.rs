//! Calendar helpers for the tracked week.

use chrono::{Datelike, Days, NaiveDate};

use crate::models::WEEK_DAYS;

pub const DAY_NAMES: [&str; WEEK_DAYS] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Sunday..Saturday bounds of the week containing `today`.
pub fn current_week_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Days::new(u64::from(today.weekday().num_days_from_sunday()));
    (start, start + Days::new(6))
}

/// Human label for the week containing `date`, numbered within its month,
/// e.g. "Week 2 of August 2026".
pub fn week_label(date: NaiveDate) -> String {
    let first_weekday = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0);
    let week = (date.day0() + first_weekday) / 7 + 1;
    format!(
        "Week {} of {} {}",
        week,
        MONTH_NAMES[date.month0() as usize],
        date.year()
    )
}

/// Parses a day given as an index ("0".."6") or a name ("sun", "Sunday", ...).
pub fn parse_day(input: &str) -> Option<usize> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return (n < WEEK_DAYS).then_some(n);
    }
    let prefix = input.get(..3)?;
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(prefix))
}
