use crate::error::{BillingEngineError, Result};
use chrono::{Days, NaiveDate};

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

pub fn first_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = add_months(year, month, 1);

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Shifts a (year, month) pair by `offset` months. Month is 1-based.
pub fn add_months(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + offset;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let (Some(start), Some(end)) = (first_day_of_month(year, month), last_day_of_month(year, month))
    else {
        return Vec::new();
    };

    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Parses a strict "YYYY-MM" starting month.
pub fn parse_year_month(value: &str) -> Result<(i32, u32)> {
    let trimmed = value.trim();
    let invalid = || BillingEngineError::InvalidStartingMonth(value.to_string());

    let (year_part, month_part) = trimmed.split_once('-').ok_or_else(invalid)?;
    if year_part.len() != 4 || month_part.len() != 2 {
        return Err(invalid());
    }

    let year: i32 = year_part.parse().map_err(|_| invalid())?;
    let month: u32 = month_part.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }

    Ok((year, month))
}

pub fn format_year_month(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Parses the leading ISO date of a key such as "2025-07-07" or "2025-07-07T00:00:00Z".
pub fn parse_iso_date_prefix(value: &str) -> Option<NaiveDate> {
    let prefix = value.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Label synthesized for a month that has no record, e.g. "July 2025".
pub fn month_label(year: i32, month: u32) -> String {
    format!("{} {}", month_name(month), year)
}

/// Daily label: short weekday, short month, day ("Tue Jul 1").
pub fn day_label(date: NaiveDate) -> String {
    date.format("%a %b %-d").to_string()
}

pub fn week_label(week_start: NaiveDate) -> String {
    format!("Week of {}", week_start.format("%b %-d, %Y"))
}

pub fn quarter_of_month(month: u32) -> u32 {
    (month.saturating_sub(1)) / 3 + 1
}
