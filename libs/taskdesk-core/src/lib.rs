//! Taskdesk Core - task tracking with filtering and report export
//!
//! This library holds everything behind the taskdesk service: the task and user
//! models, an SQLite-backed task store, the filter pipeline that turns raw query
//! parameters into an owner-scoped query, and the renderers that turn a task
//! list into a downloadable report.
//!
//! # Features
//!
//! - **Owner-scoped storage**: every task operation takes the caller's identity explicitly
//! - **Filter pipeline**: field-level validation, predicate lists compiled to SQL or
//!   evaluated in memory
//! - **Reports**: paginated PDF output and CSV export
//! - **Attachments**: per-owner file storage referenced from tasks
//! - **Accounts**: Argon2 password hashes, signed session and password reset tokens
//!
//! # Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use taskdesk_core::{run_task_listing, Renderers, TaskDatabase, TaskListing, TaskdeskError};
//!
//! # async fn example(owner: uuid::Uuid) -> Result<(), TaskdeskError> {
//! let db = TaskDatabase::from_connection_string("sqlite://taskdesk.db").await?;
//!
//! let mut params = HashMap::new();
//! params.insert("status".to_string(), "completed".to_string());
//! params.insert("export".to_string(), "pdf".to_string());
//!
//! if let TaskListing::Report(report) =
//!     run_task_listing(&db, &Renderers::default(), owner, &params).await?
//! {
//!     std::fs::write(report.filename, report.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `export-csv` (default): CSV report export
//! - `test-utils`: Enable test fixtures (for testing only)

pub mod accounts;
pub mod attachments;
pub mod auth;
pub mod config;
pub mod config_loader;
pub mod database;
pub mod error;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use accounts::{AccountService, LogResetNotifier, ResetNotifier, Session};
pub use attachments::{download_name, AttachmentStore};
pub use auth::{TokenPurpose, TokenSigner};
pub use config::{AppConfig, LogFormat, PartialConfig};
pub use config_loader::ConfigLoader;
pub use database::{DatabasePoolConfig, TaskDatabase};
pub use error::{Result, TaskdeskError};
pub use filter::parse_filter_params;
pub use models::{
    CreateTaskRequest, CreateUserRequest, StoreStats, Task, TaskFilters, TaskStatus,
    UpdateTaskRequest, User,
};
pub use pipeline::{run_task_listing, ExportFormat, Renderers, Report, TaskListing};
pub use query::{Operator, Predicate, TaskField, TaskQuery};
#[cfg(feature = "export-csv")]
pub use report::CsvReportRenderer;
pub use report::{PdfReportConfig, PdfReportRenderer, RenderError, ReportRenderer};
pub use store::{MemoryTaskStore, TaskStore};
pub use validation::FieldErrors;
