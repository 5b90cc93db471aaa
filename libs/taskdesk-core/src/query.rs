//! Task query composition
//!
//! A [`TaskQuery`] is an owner identity plus a conjunction of [`Predicate`]s, each a
//! `(field, operator, value)` triple. The owner is a separate, mandatory part of the
//! query rather than a predicate, so filter input can never widen it.
//!
//! The same query can be compiled to parameterised SQL for the database store or
//! evaluated directly against [`Task`] values. Both evaluators agree, including the
//! ordering: newest first, ties broken by descending id.
//!
//! Text matching is case-insensitive over ASCII letters, which is what SQLite's
//! `lower()` provides. Non-ASCII text must match its case exactly.

use crate::models::{Task, TaskFilters, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// Column list used by every task SELECT
pub const TASK_COLUMNS: &str =
    "id, owner_id, name, description, status, priority, file, created_at, updated_at";

/// Task field a predicate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Name,
    Description,
    Status,
    CreatedAt,
}

impl TaskField {
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Status => "status",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Substring match ignoring ASCII case only; `É` and `é` are different letters
    Contains,
    /// Exact equality
    Eq,
    /// Greater than or equal
    Gte,
    /// Strictly less than
    Lt,
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateValue {
    Text(String),
    Status(TaskStatus),
    Timestamp(DateTime<Utc>),
}

/// A value bound to a `?` placeholder in compiled SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
}

/// One `(field, operator, value)` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: TaskField,
    pub op: Operator,
    pub value: PredicateValue,
}

impl Predicate {
    /// Substring match on a text field, ignoring ASCII case
    ///
    /// Only `A-Z` fold to `a-z`, matching SQLite's built-in `lower()`. Accented and
    /// other non-ASCII letters must match their case exactly.
    #[must_use]
    pub fn contains(field: TaskField, needle: &str) -> Self {
        Self {
            field,
            op: Operator::Contains,
            value: PredicateValue::Text(needle.to_ascii_lowercase()),
        }
    }

    #[must_use]
    pub fn status_is(status: TaskStatus) -> Self {
        Self {
            field: TaskField::Status,
            op: Operator::Eq,
            value: PredicateValue::Status(status),
        }
    }

    #[must_use]
    pub fn created_at_or_after(instant: DateTime<Utc>) -> Self {
        Self {
            field: TaskField::CreatedAt,
            op: Operator::Gte,
            value: PredicateValue::Timestamp(instant),
        }
    }

    #[must_use]
    pub fn created_before(instant: DateTime<Utc>) -> Self {
        Self {
            field: TaskField::CreatedAt,
            op: Operator::Lt,
            value: PredicateValue::Timestamp(instant),
        }
    }

    /// Evaluate against a task in memory
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        match (&self.value, self.op) {
            (PredicateValue::Text(needle), Operator::Contains) => {
                let haystack = match self.field {
                    TaskField::Name => task.name.as_str(),
                    TaskField::Description => task.description.as_str(),
                    TaskField::Status => task.status.as_str(),
                    TaskField::CreatedAt => return false,
                };
                haystack.to_ascii_lowercase().contains(needle.as_str())
            }
            (PredicateValue::Text(text), Operator::Eq) => match self.field {
                TaskField::Name => task.name == *text,
                TaskField::Description => task.description == *text,
                TaskField::Status => task.status.as_str() == text.as_str(),
                TaskField::CreatedAt => false,
            },
            (PredicateValue::Status(status), Operator::Eq) => {
                self.field == TaskField::Status && task.status == *status
            }
            (PredicateValue::Timestamp(instant), op) if self.field == TaskField::CreatedAt => {
                match op {
                    Operator::Gte => task.created_at >= *instant,
                    Operator::Lt => task.created_at < *instant,
                    Operator::Eq => task.created_at == *instant,
                    Operator::Contains => false,
                }
            }
            _ => false,
        }
    }

    fn push_sql(&self, sql: &mut String, binds: &mut Vec<SqlValue>) {
        let column = self.field.column();
        let bind = match &self.value {
            PredicateValue::Text(text) => SqlValue::Text(text.clone()),
            PredicateValue::Status(status) => SqlValue::Text(status.as_str().to_string()),
            PredicateValue::Timestamp(instant) => SqlValue::Integer(instant.timestamp_micros()),
        };
        match self.op {
            // instr() keeps % and _ in the needle literal, unlike LIKE
            Operator::Contains => sql.push_str(&format!(" AND instr(lower({column}), ?) > 0")),
            Operator::Eq => sql.push_str(&format!(" AND {column} = ?")),
            Operator::Gte => sql.push_str(&format!(" AND {column} >= ?")),
            Operator::Lt => sql.push_str(&format!(" AND {column} < ?")),
        }
        binds.push(bind);
    }
}

/// SQL text plus its positional bind values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

/// Midnight UTC at the start of `date`
#[must_use]
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Owner-scoped task query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    owner: Uuid,
    predicates: Vec<Predicate>,
    limit: Option<usize>,
}

impl TaskQuery {
    /// Query matching every task of `owner`
    #[must_use]
    pub fn for_owner(owner: Uuid) -> Self {
        Self {
            owner,
            predicates: Vec::new(),
            limit: None,
        }
    }

    /// Build the predicate list for validated filter criteria
    ///
    /// Date bounds cover whole days: `start_date` matches from its first instant,
    /// `end_date` up to but excluding the first instant of the next day.
    #[must_use]
    pub fn from_filters(owner: Uuid, filters: &TaskFilters) -> Self {
        let mut query = Self::for_owner(owner);
        if let Some(name) = &filters.name_contains {
            query = query.name_contains(name);
        }
        if let Some(description) = &filters.description_contains {
            query = query.description_contains(description);
        }
        if let Some(status) = filters.status {
            query = query.status(status);
        }
        if let Some(start) = filters.start_date {
            query = query.created_on_or_after(start);
        }
        if let Some(end) = filters.end_date {
            query = query.created_on_or_before(end);
        }
        query
    }

    /// Names containing `needle`, ignoring ASCII case only
    #[must_use]
    pub fn name_contains(self, needle: &str) -> Self {
        self.with_predicate(Predicate::contains(TaskField::Name, needle))
    }

    /// Descriptions containing `needle`, ignoring ASCII case only
    #[must_use]
    pub fn description_contains(self, needle: &str) -> Self {
        self.with_predicate(Predicate::contains(TaskField::Description, needle))
    }

    #[must_use]
    pub fn status(self, status: TaskStatus) -> Self {
        self.with_predicate(Predicate::status_is(status))
    }

    #[must_use]
    pub fn created_on_or_after(self, date: NaiveDate) -> Self {
        self.with_predicate(Predicate::created_at_or_after(start_of_day(date)))
    }

    /// Include the whole of `date`. The last representable date has no upper bound.
    #[must_use]
    pub fn created_on_or_before(self, date: NaiveDate) -> Self {
        match date.succ_opt() {
            Some(next) => self.with_predicate(Predicate::created_before(start_of_day(next))),
            None => self,
        }
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn owner(&self) -> Uuid {
        self.owner
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Whether `task` belongs to the owner and satisfies every predicate
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.owner_id == self.owner && self.predicates.iter().all(|p| p.matches(task))
    }

    /// Result ordering: newest first, then descending id
    #[must_use]
    pub fn ordering(a: &Task, b: &Task) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }

    /// Filter, order and truncate an in-memory collection
    #[must_use]
    pub fn apply<'a, I>(&self, tasks: I) -> Vec<Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut selected: Vec<Task> = tasks
            .into_iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect();
        selected.sort_by(Self::ordering);
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }

    /// Compile to a parameterised SELECT over the `tasks` table
    #[must_use]
    pub fn to_sql(&self) -> CompiledQuery {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?");
        let mut binds = vec![SqlValue::Text(self.owner.to_string())];

        for predicate in &self.predicates {
            predicate.push_sql(&mut sql, &mut binds);
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            binds.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        CompiledQuery { sql, binds }
    }
}
