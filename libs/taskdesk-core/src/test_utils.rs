//! Fixtures for tests: databases, users and tasks with fixed creation times

use crate::accounts::ResetNotifier;
use crate::auth::hash_password;
use crate::database::mappers::to_micros;
use crate::database::TaskDatabase;
use crate::error::{Result, TaskdeskError};
use crate::models::{CreateTaskRequest, Task, TaskStatus, User};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Password of every user made by [`create_test_user`]
pub const TEST_PASSWORD: &str = "test-password-1";

/// A migrated database in a temporary directory
///
/// Keep the returned `TempDir` alive for as long as the database is used.
///
/// # Errors
/// Returns an error if the directory or database cannot be created
pub async fn create_test_database_and_connect() -> Result<(TaskDatabase, TempDir)> {
    let dir = TempDir::new()?;
    let db = TaskDatabase::new(&dir.path().join("taskdesk-test.db")).await?;
    Ok((db, dir))
}

/// Register a user whose password is [`TEST_PASSWORD`]
///
/// # Errors
/// Returns an error if the username is taken or the insert fails
pub async fn create_test_user(db: &TaskDatabase, username: &str) -> Result<User> {
    let hash = hash_password(TEST_PASSWORD)?;
    db.create_user(username, &format!("{username}@example.com"), &hash)
        .await
}

/// Midnight UTC on the given day
///
/// # Panics
/// Panics if the date is invalid
#[must_use]
pub fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|| panic!("invalid test date {year}-{month}-{day}"))
}

/// Insert a task and backdate it to `created_at`
///
/// # Errors
/// Returns an error if the insert or backdating fails
pub async fn seed_task(
    db: &TaskDatabase,
    owner: Uuid,
    name: &str,
    status: TaskStatus,
    created_at: DateTime<Utc>,
) -> Result<Task> {
    let id = db
        .create_task(owner, CreateTaskRequest {
            name: name.to_string(),
            status: Some(status),
            ..Default::default()
        })
        .await?;

    sqlx::query("UPDATE tasks SET created_at = ?, updated_at = ? WHERE id = ?")
        .bind(to_micros(&created_at))
        .bind(to_micros(&created_at))
        .bind(id.to_string())
        .execute(db.pool())
        .await
        .map_err(|e| TaskdeskError::database(format!("Failed to backdate task: {e}")))?;

    db.get_task(id, owner).await
}

/// An unsaved task for in-memory stores
#[must_use]
pub fn mock_task(owner: Uuid, name: &str, status: TaskStatus, created_at: DateTime<Utc>) -> Task {
    Task {
        id: Uuid::new_v4(),
        owner_id: owner,
        name: name.to_string(),
        description: String::new(),
        status,
        priority: 1,
        file: None,
        created_at,
        updated_at: created_at,
    }
}

/// Reset notifier that keeps every token it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(user id, token)` pairs in send order
    pub async fn sent(&self) -> Vec<(Uuid, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn last_token(&self) -> Option<String> {
        self.sent.lock().await.last().map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_reset(&self, user: &User, token: &str) -> Result<()> {
        self.sent.lock().await.push((user.id, token.to_string()));
        Ok(())
    }
}
