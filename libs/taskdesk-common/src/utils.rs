//! Formatting and parsing helpers

use crate::constants::DATE_FORMATS;
use chrono::{DateTime, NaiveDate, Utc};

/// Format a date for display
#[must_use]
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a datetime for display
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Parse a calendar date in any of the accepted [`DATE_FORMATS`]
///
/// Formats are tried in order, so an ISO date always wins.
///
/// # Errors
/// Returns the parse error of the first format if no format matches
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    let mut first_error = None;
    for format in DATE_FORMATS {
        match NaiveDate::parse_from_str(date_str, format) {
            Ok(date) => return Ok(date),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => NaiveDate::parse_from_str(date_str, "%Y-%m-%d"),
    }
}
