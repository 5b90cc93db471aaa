//! Task store interface
//!
//! Every operation takes the caller's identity explicitly. Reads, updates and
//! deletes of a task owned by someone else fail exactly like a missing task.

use crate::database::TaskDatabase;
use crate::error::{Result, TaskdeskError};
use crate::models::{CreateTaskRequest, Task, UpdateTaskRequest};
use crate::query::TaskQuery;
use crate::validation::{validate_create_task, validate_update_task};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use taskdesk_common::DEFAULT_PRIORITY;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Owner-scoped task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task owned by `owner`, returning its id
    async fn insert(&self, owner: Uuid, request: CreateTaskRequest) -> Result<Uuid>;

    /// Fetch a task, `TaskNotFound` unless it exists and belongs to `owner`
    async fn get(&self, id: Uuid, owner: Uuid) -> Result<Task>;

    /// Change the fields present in `request`
    async fn update(&self, id: Uuid, owner: Uuid, request: UpdateTaskRequest) -> Result<Task>;

    /// Remove a task permanently
    async fn delete(&self, id: Uuid, owner: Uuid) -> Result<()>;

    /// Tasks matching `query`, in query order
    async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>>;
}

#[async_trait]
impl TaskStore for TaskDatabase {
    async fn insert(&self, owner: Uuid, request: CreateTaskRequest) -> Result<Uuid> {
        self.create_task(owner, request).await
    }

    async fn get(&self, id: Uuid, owner: Uuid) -> Result<Task> {
        self.get_task(id, owner).await
    }

    async fn update(&self, id: Uuid, owner: Uuid, request: UpdateTaskRequest) -> Result<Task> {
        self.update_task(id, owner, request).await
    }

    async fn delete(&self, id: Uuid, owner: Uuid) -> Result<()> {
        self.delete_task(id, owner).await
    }

    async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        self.query_tasks(query).await
    }
}

/// Task store held in process memory
///
/// Evaluates queries with [`TaskQuery::apply`]. Useful for tests and for running
/// the listing pipeline without a database.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully-formed task as is, replacing any task with the same id
    pub async fn put(&self, task: Task) {
        self.tasks.write().await.insert(task.id, task);
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(dt.timestamp_micros()).unwrap_or(dt)
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    #[instrument(skip(self, request))]
    async fn insert(&self, owner: Uuid, request: CreateTaskRequest) -> Result<Uuid> {
        validate_create_task(&request)?;
        let now = truncate_to_micros(Utc::now());
        let task = Task {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: request.name.trim().to_string(),
            description: request.description,
            status: request.status.unwrap_or_default(),
            priority: request.priority.unwrap_or(DEFAULT_PRIORITY),
            file: request.file,
            created_at: now,
            updated_at: now,
        };
        let id = task.id;
        self.put(task).await;
        Ok(id)
    }

    async fn get(&self, id: Uuid, owner: Uuid) -> Result<Task> {
        self.tasks
            .read()
            .await
            .get(&id)
            .filter(|t| t.owner_id == owner)
            .cloned()
            .ok_or_else(|| TaskdeskError::task_not_found(id))
    }

    #[instrument(skip(self, request))]
    async fn update(&self, id: Uuid, owner: Uuid, request: UpdateTaskRequest) -> Result<Task> {
        validate_update_task(&request)?;
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&id)
            .filter(|t| t.owner_id == owner)
            .ok_or_else(|| TaskdeskError::task_not_found(id))?;

        if let Some(name) = request.name {
            task.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            task.description = description;
        }
        if let Some(status) = request.status {
            task.status = status;
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        if request.file.is_some() || request.clear_file {
            task.file = request.file;
        }
        task.updated_at = task.updated_at.max(truncate_to_micros(Utc::now()));
        Ok(task.clone())
    }

    async fn delete(&self, id: Uuid, owner: Uuid) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(&id) {
            Some(task) if task.owner_id == owner => {
                tasks.remove(&id);
                Ok(())
            }
            _ => Err(TaskdeskError::task_not_found(id)),
        }
    }

    async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let result = query.apply(tasks.values());
        debug!("Memory query returned {} of {} tasks", result.len(), tasks.len());
        Ok(result)
    }
}
