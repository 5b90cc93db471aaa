use crate::{
    database::{
        mappers::{map_task_row, to_micros},
        query_builders::TaskUpdateBuilder,
        schema::SCHEMA,
    },
    error::{Result, TaskdeskError},
    models::{CreateTaskRequest, StoreStats, Task, UpdateTaskRequest},
    query::{SqlValue, TaskQuery, TASK_COLUMNS},
    validation::{validate_create_task, validate_update_task},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use taskdesk_common::DEFAULT_PRIORITY;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Connection pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasePoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Idle timeout for connections
    pub idle_timeout: Duration,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Use write-ahead logging (ignored for in-memory databases)
    pub enable_wal_mode: bool,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            enable_wal_mode: true,
        }
    }
}

/// SQLite-backed task and account storage
///
/// Cheap to clone: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct TaskDatabase {
    pool: SqlitePool,
}

impl TaskDatabase {
    /// Open (creating if needed) a database file with the default pool configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema migration fails
    #[instrument]
    pub async fn new(database_path: &Path) -> Result<Self> {
        let url = format!("sqlite://{}", database_path.display());
        Self::from_connection_string_with_config(&url, DatabasePoolConfig::default()).await
    }

    /// Connect using a `sqlite:` URL with the default pool configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, or the connection or migration fails
    #[instrument]
    pub async fn from_connection_string(database_url: &str) -> Result<Self> {
        Self::from_connection_string_with_config(database_url, DatabasePoolConfig::default())
            .await
    }

    /// Connect using a `sqlite:` URL with a custom pool configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, or the connection or migration fails
    #[instrument]
    pub async fn from_connection_string_with_config(
        database_url: &str,
        config: DatabasePoolConfig,
    ) -> Result<Self> {
        if is_memory_url(database_url) {
            return Self::in_memory().await;
        }

        info!("Connecting to SQLite database: {}", database_url);

        let journal_mode = if config.enable_wal_mode {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| TaskdeskError::configuration(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(journal_mode)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;

        info!(
            "Database connection pool established with {} max connections",
            config.max_connections
        );
        Ok(db)
    }

    /// Private in-memory database
    ///
    /// Uses a single connection that is never recycled, since every new SQLite
    /// memory connection would start out empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    #[instrument]
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| TaskdeskError::configuration(format!("Invalid database URL: {e}")))?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Memory);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to open in-memory database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        debug!("In-memory database ready");
        Ok(db)
    }

    /// Create tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| TaskdeskError::database(format!("Failed to apply schema: {e}")))?;
        }
        debug!("Schema up to date ({} statements)", SCHEMA.len());
        Ok(())
    }

    /// Get the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the database is connected
    #[instrument(skip(self))]
    pub async fn is_connected(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                debug!("Database connection is healthy");
                true
            }
            Err(e) => {
                error!("Database connection check failed: {}", e);
                false
            }
        }
    }

    /// Row counts
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<StoreStats> {
        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to count users: {e}")))?;

        let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to count tasks: {e}")))?;

        Ok(StoreStats {
            user_count: user_count.try_into().unwrap_or(0),
            task_count: task_count.try_into().unwrap_or(0),
        })
    }

    /// Create a task owned by `owner`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the request fails validation, or a database error
    #[instrument(skip(self, request))]
    pub async fn create_task(&self, owner: Uuid, request: CreateTaskRequest) -> Result<Uuid> {
        validate_create_task(&request)?;

        let id = Uuid::new_v4();
        let now = to_micros(&Utc::now());

        sqlx::query(
            r"
            INSERT INTO tasks (
                id, owner_id, name, description, status, priority, file, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(id.to_string())
        .bind(owner.to_string())
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.status.unwrap_or_default().as_str())
        .bind(request.priority.unwrap_or(DEFAULT_PRIORITY))
        .bind(request.file.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| TaskdeskError::database(format!("Failed to create task: {e}")))?;

        info!("Created task with ID: {}", id);
        Ok(id)
    }

    /// Fetch one task of `owner`
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task does not exist or belongs to someone else
    #[instrument(skip(self))]
    pub async fn get_task(&self, id: Uuid, owner: Uuid) -> Result<Task> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND owner_id = ?"
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskdeskError::database(format!("Failed to fetch task: {e}")))?;

        match row {
            Some(row) => map_task_row(&row),
            None => Err(TaskdeskError::task_not_found(id)),
        }
    }

    /// Update the fields present in `request`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for invalid fields, `TaskNotFound` if the task does
    /// not exist or belongs to someone else
    #[instrument(skip(self, request))]
    pub async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        request: UpdateTaskRequest,
    ) -> Result<Task> {
        validate_update_task(&request)?;

        let builder = TaskUpdateBuilder::from_request(&request);
        let query_string = builder.build_query_string();
        let mut q = sqlx::query(&query_string);

        // Bind values in the same order as the builder added fields
        if let Some(name) = &request.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(description) = &request.description {
            q = q.bind(description.clone());
        }
        if let Some(status) = request.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = request.priority {
            q = q.bind(priority);
        }
        if request.file.is_some() || request.clear_file {
            q = q.bind(request.file.clone());
        }

        let result = q
            .bind(to_micros(&Utc::now()))
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to update task: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(TaskdeskError::task_not_found(id));
        }

        info!("Updated task {} ({:?})", id, builder.fields());
        self.get_task(id, owner).await
    }

    /// Permanently delete a task of `owner`
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task does not exist or belongs to someone else
    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to delete task: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(TaskdeskError::task_not_found(id));
        }

        info!("Deleted task with ID: {}", id);
        Ok(())
    }

    /// Run an owner-scoped task query
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a row cannot be mapped
    #[instrument(skip(self, query), fields(owner = %query.owner(), predicates = query.predicates().len()))]
    pub async fn query_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let compiled = query.to_sql();
        let mut q = sqlx::query(&compiled.sql);
        for value in &compiled.binds {
            q = match value {
                SqlValue::Text(text) => q.bind(text.as_str()),
                SqlValue::Integer(n) => q.bind(*n),
            };
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TaskdeskError::database(format!("Failed to query tasks: {e}")))?;

        let tasks = rows.iter().map(map_task_row).collect::<Result<Vec<_>>>()?;
        debug!("Task query returned {} rows", tasks.len());
        Ok(tasks)
    }
}

fn is_memory_url(url: &str) -> bool {
    matches!(url, "sqlite::memory:" | "sqlite://:memory:" | ":memory:")
}
