use chrono::{Datelike, NaiveDate};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date \"{0}\"")]
pub struct InvalidDate(pub String);

/// Parse a user-entered date. Accepts `YYYY-MM-DD` and `M/D/YYYY`.
pub fn parse_date(input: &str) -> Result<NaiveDate, InvalidDate> {
    let s = input.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .map_err(|_| InvalidDate(input.to_string()))
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Move a date forward by `months`, clamping the day to the end of the
/// target month (Jan 31 + 1 month = Feb 28).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = date.day().min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

pub fn increment_month(date: NaiveDate) -> NaiveDate {
    add_months(date, 1)
}

pub fn increment_quarter(date: NaiveDate) -> NaiveDate {
    add_months(date, 3)
}
