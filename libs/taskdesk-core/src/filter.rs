//! Filter criteria parsing
//!
//! Turns raw string parameters (usually the query string of a task listing request)
//! into validated [`TaskFilters`]. Each field is optional. A missing or blank value
//! imposes no constraint, it never means "match the empty string".
//!
//! `name` and `description` are substring filters that ignore ASCII case only:
//! "ship" finds "Ship Report", but "été" does not find "Été".
//!
//! Any invalid field rejects the whole request: the caller gets every field error
//! at once and no partially-applied filter is ever produced.

use crate::error::Result;
use crate::models::{TaskFilters, TaskStatus};
use crate::validation::FieldErrors;
use chrono::NaiveDate;
use std::collections::HashMap;
use taskdesk_common::{parse_date, MAX_NAME_LENGTH};

pub const NAME_PARAM: &str = "name";
pub const DESCRIPTION_PARAM: &str = "description";
pub const STATUS_PARAM: &str = "status";
pub const START_DATE_PARAM: &str = "start_date";
pub const END_DATE_PARAM: &str = "end_date";

/// Status value meaning "any status"
pub const ALL_STATUSES: &str = "all";

fn non_blank<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_date_field(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    match parse_date(raw) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Enter a valid date.");
            None
        }
    }
}

/// Parse raw filter parameters
///
/// Unknown keys are ignored, so the same map may carry unrelated flags such as `export`.
///
/// # Errors
/// Returns [`crate::TaskdeskError::InvalidInput`] listing every invalid field
pub fn parse_filter_params(params: &HashMap<String, String>) -> Result<TaskFilters> {
    let mut errors = FieldErrors::new();
    let mut filters = TaskFilters::default();

    if let Some(name) = non_blank(params, NAME_PARAM) {
        if name.chars().count() > MAX_NAME_LENGTH {
            errors.add(
                NAME_PARAM,
                format!("Ensure this value has at most {MAX_NAME_LENGTH} characters."),
            );
        } else {
            filters.name_contains = Some(name.to_string());
        }
    }

    filters.description_contains = non_blank(params, DESCRIPTION_PARAM).map(str::to_string);

    if let Some(status) = non_blank(params, STATUS_PARAM) {
        if status != ALL_STATUSES {
            match status.parse::<TaskStatus>() {
                Ok(status) => filters.status = Some(status),
                Err(_) => errors.add(
                    STATUS_PARAM,
                    format!(
                        "Select a valid choice. {status} is not one of the available choices: all, {}.",
                        TaskStatus::ALL.map(TaskStatus::as_str).join(", ")
                    ),
                ),
            }
        }
    }

    filters.start_date = parse_date_field(
        &mut errors,
        START_DATE_PARAM,
        non_blank(params, START_DATE_PARAM),
    );
    filters.end_date = parse_date_field(
        &mut errors,
        END_DATE_PARAM,
        non_blank(params, END_DATE_PARAM),
    );

    if let (Some(start), Some(end)) = (filters.start_date, filters.end_date) {
        if end < start {
            errors.add(END_DATE_PARAM, "End date must not be before start date.");
        }
    }

    errors.into_result(filters)
}
