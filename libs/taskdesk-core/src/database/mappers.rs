//! Row mapping utilities for converting database rows to domain models

use crate::{
    error::{Result, TaskdeskError},
    models::{Task, TaskStatus, User},
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Storage form of a timestamp
#[must_use]
pub fn to_micros(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

/// Read back a stored timestamp
///
/// # Errors
/// Returns a database error if the value is outside chrono's range
pub fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000)
        .map_err(|e| TaskdeskError::database(format!("Invalid timestamp {micros}: {e}")))?;
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| TaskdeskError::database(format!("Timestamp out of range: {micros}")))
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| TaskdeskError::database(format!("Failed to read column {column}: {e}")))
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = get(row, column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| TaskdeskError::database(format!("Invalid UUID in {column}: {e}")))
}

/// Map a `tasks` row to a [`Task`]
///
/// # Errors
/// Returns an error if a column is missing or holds an unexpected value
pub fn map_task_row(row: &SqliteRow) -> Result<Task> {
    let status: String = get(row, "status")?;
    let status = status
        .parse::<TaskStatus>()
        .map_err(|_| TaskdeskError::database(format!("Invalid status in database: {status}")))?;

    Ok(Task {
        id: get_uuid(row, "id")?,
        owner_id: get_uuid(row, "owner_id")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        status,
        priority: get(row, "priority")?,
        file: get(row, "file")?,
        created_at: from_micros(get(row, "created_at")?)?,
        updated_at: from_micros(get(row, "updated_at")?)?,
    })
}

/// Map a `users` row to a [`User`]
///
/// # Errors
/// Returns an error if a column is missing or holds an unexpected value
pub fn map_user_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: get_uuid(row, "id")?,
        username: get(row, "username")?,
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        created_at: from_micros(get(row, "created_at")?)?,
        updated_at: from_micros(get(row, "updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_micros_round_trip_keeps_microseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(from_micros(to_micros(&dt)).unwrap(), dt);
    }

    #[test]
    fn test_from_micros_before_epoch() {
        let dt = from_micros(-1).unwrap();
        assert_eq!(dt.timestamp(), -1);
        assert_eq!(dt.timestamp_subsec_micros(), 999_999);
    }

    #[test]
    fn test_from_micros_out_of_range() {
        assert!(from_micros(i64::MAX).is_err());
    }
}
