//! Account storage

use crate::{
    database::{
        mappers::{map_user_row, to_micros},
        TaskDatabase,
    },
    error::{Result, TaskdeskError},
    models::User,
};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

impl TaskDatabase {
    /// Insert a user with an already-hashed password
    ///
    /// # Errors
    ///
    /// Returns `DuplicateUser` if the username is taken, or a database error
    #[instrument(skip(self, password_hash))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let id = Uuid::new_v4();
        let now = to_micros(&Utc::now());

        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!("Registration rejected, username taken: {}", username);
                return Err(TaskdeskError::DuplicateUser {
                    username: username.to_string(),
                });
            }
            Err(e) => {
                return Err(TaskdeskError::database(format!("Failed to create user: {e}")));
            }
        }

        info!("Created user {} ({})", username, id);
        self.get_user(id).await
    }

    /// Fetch a user by id
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if there is no such user
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to fetch user: {e}")))?;

        match row {
            Some(row) => map_user_row(&row),
            None => Err(TaskdeskError::UserNotFound { id: id.to_string() }),
        }
    }

    /// Fetch a user by exact username
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[instrument(skip(self))]
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| TaskdeskError::database(format!("Failed to fetch user: {e}")))?;

        row.as_ref().map(map_user_row).transpose()
    }

    /// Every user registered with `email`, compared case-insensitively
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[instrument(skip(self))]
    pub async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?) ORDER BY created_at"
        ))
        .bind(email.trim())
        .fetch_all(self.pool())
        .await
        .map_err(|e| TaskdeskError::database(format!("Failed to fetch users: {e}")))?;

        rows.iter().map(map_user_row).collect()
    }

    /// Change a user's email address
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if there is no such user
    #[instrument(skip(self))]
    pub async fn update_user_email(&self, id: Uuid, email: &str) -> Result<User> {
        self.update_user_column(id, "email", email).await
    }

    /// Replace a user's password hash
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if there is no such user
    #[instrument(skip(self, password_hash))]
    pub async fn update_user_password(&self, id: Uuid, password_hash: &str) -> Result<User> {
        self.update_user_column(id, "password_hash", password_hash)
            .await
    }

    async fn update_user_column(&self, id: Uuid, column: &'static str, value: &str) -> Result<User> {
        let result = sqlx::query(&format!(
            "UPDATE users SET {column} = ?, updated_at = MAX(?, updated_at + 1) WHERE id = ?"
        ))
        .bind(value)
        .bind(to_micros(&Utc::now()))
        .bind(id.to_string())
        .execute(self.pool())
        .await
        .map_err(|e| TaskdeskError::database(format!("Failed to update user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(TaskdeskError::UserNotFound { id: id.to_string() });
        }

        info!("Updated {} for user {}", column, id);
        self.get_user(id).await
    }

    /// Delete a user and, through the foreign key cascade, all of their tasks
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if there is no such user
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to delete user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(TaskdeskError::UserNotFound { id: id.to_string() });
        }

        info!("Deleted user {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateTaskRequest;
    use crate::query::TaskQuery;

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = TaskDatabase::in_memory().await.unwrap();
        db.create_user("alice", "a@example.com", "h1").await.unwrap();

        let result = db.create_user("alice", "other@example.com", "h2").await;
        assert!(matches!(
            result,
            Err(TaskdeskError::DuplicateUser { ref username }) if username == "alice"
        ));
    }

    #[tokio::test]
    async fn test_find_by_username_and_email() {
        let db = TaskDatabase::in_memory().await.unwrap();
        let alice = db.create_user("alice", "Shared@Example.com", "h").await.unwrap();
        let bob = db.create_user("bob", "shared@example.com", "h").await.unwrap();

        let found = db.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(db.find_user_by_username("ALICE").await.unwrap().is_none());

        let ids: Vec<_> = db
            .find_users_by_email("shared@EXAMPLE.com")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&alice.id) && ids.contains(&bob.id));
    }

    #[tokio::test]
    async fn test_password_update_advances_updated_at() {
        let db = TaskDatabase::in_memory().await.unwrap();
        let user = db.create_user("carol", "c@example.com", "old").await.unwrap();

        let updated = db.update_user_password(user.id, "new").await.unwrap();
        assert_eq!(updated.password_hash, "new");
        assert!(updated.updated_at > user.updated_at);
    }

    #[tokio::test]
    async fn test_delete_user_cascades_tasks() {
        let db = TaskDatabase::in_memory().await.unwrap();
        let user = db.create_user("dave", "d@example.com", "h").await.unwrap();
        db.create_task(
            user.id,
            CreateTaskRequest {
                name: "goes away".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        db.delete_user(user.id).await.unwrap();
        assert_eq!(db.get_stats().await.unwrap().task_count, 0);
        assert!(db
            .query_tasks(&TaskQuery::for_owner(user.id))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            db.get_user(user.id).await,
            Err(TaskdeskError::UserNotFound { .. })
        ));
    }
}
