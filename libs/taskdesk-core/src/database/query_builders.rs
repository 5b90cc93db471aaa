//! Builders for dynamic SQL statements

use crate::models::UpdateTaskRequest;

/// Builder for UPDATE statements on the `tasks` table
///
/// Lists only the columns present in the request. `updated_at` is always written
/// and never moves backwards, and the WHERE clause always scopes by owner.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdateBuilder {
    columns: Vec<&'static str>,
}

impl TaskUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every column present in an [`UpdateTaskRequest`]
    ///
    /// Columns are added in a fixed order, which is also the order values must be bound in.
    #[must_use]
    pub fn from_request(request: &UpdateTaskRequest) -> Self {
        let mut builder = Self::new();

        if request.name.is_some() {
            builder = builder.add_field("name");
        }
        if request.description.is_some() {
            builder = builder.add_field("description");
        }
        if request.status.is_some() {
            builder = builder.add_field("status");
        }
        if request.priority.is_some() {
            builder = builder.add_field("priority");
        }
        if request.file.is_some() || request.clear_file {
            builder = builder.add_field("file");
        }

        builder
    }

    #[must_use]
    pub fn add_field(mut self, column: &'static str) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.columns
    }

    /// Build the statement
    ///
    /// Placeholders: one per field, then the modification time, task id and owner id.
    #[must_use]
    pub fn build_query_string(&self) -> String {
        let mut assignments: Vec<String> = self.columns.iter().map(|c| format!("{c} = ?")).collect();
        assignments.push("updated_at = MAX(?, updated_at)".to_string());
        format!(
            "UPDATE tasks SET {} WHERE id = ? AND owner_id = ?",
            assignments.join(", ")
        )
    }
}
