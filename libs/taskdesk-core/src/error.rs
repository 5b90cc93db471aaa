//! Error types for the taskdesk core library

use crate::report::RenderError;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Result type alias for taskdesk operations
pub type Result<T> = std::result::Result<T, TaskdeskError>;

/// Main error type for taskdesk operations
#[derive(Error, Debug)]
pub enum TaskdeskError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more input fields failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(FieldErrors),

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The task does not exist or belongs to another user.
    /// Both cases produce the same error.
    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Username already taken: {username}")]
    DuplicateUser { username: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Report rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl TaskdeskError {
    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a single-field input error
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::InvalidInput(errors)
    }

    /// Create a task-not-found error
    pub fn task_not_found(id: impl ToString) -> Self {
        Self::TaskNotFound { id: id.to_string() }
    }

    /// Create an invalid-token error
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Whether this error was caused by the caller's input rather than the service
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::Validation { .. }
                | Self::TaskNotFound { .. }
                | Self::UserNotFound { .. }
                | Self::DuplicateUser { .. }
                | Self::InvalidCredentials
                | Self::InvalidToken { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_serialization_error_from_serde() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: TaskdeskError = json_error.into();

        match error {
            TaskdeskError::Serialization(_) => (),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_io_error_from_std() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: TaskdeskError = io_error.into();

        match error {
            TaskdeskError::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_render_error_is_distinct() {
        let error: TaskdeskError = RenderError::TooManyTasks { count: 10, max: 5 }.into();
        assert!(matches!(error, TaskdeskError::Render(_)));
        assert!(!error.is_client_error());
        assert!(error.to_string().contains("Report rendering failed"));
    }

    #[test]
    fn test_task_not_found_error() {
        let error = TaskdeskError::task_not_found("task-123");
        assert!(error.to_string().contains("Task not found"));
        assert!(error.to_string().contains("task-123"));
        assert!(error.is_client_error());
    }

    #[test]
    fn test_invalid_field_error() {
        let error = TaskdeskError::invalid_field("status", "Select a valid choice.");
        match &error {
            TaskdeskError::InvalidInput(fields) => {
                assert_eq!(fields.get("status"), Some(&["Select a valid choice.".to_string()][..]));
            }
            _ => panic!("Expected InvalidInput error"),
        }
        assert!(error.to_string().contains("status"));
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let error = TaskdeskError::InvalidCredentials;
        assert_eq!(error.to_string(), "Invalid username or password");
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(
            TaskdeskError::database("boom"),
            TaskdeskError::Database(ref m) if m == "boom"
        ));
        assert!(TaskdeskError::validation("bad")
            .to_string()
            .contains("Validation error"));
        assert!(TaskdeskError::configuration("missing secret")
            .to_string()
            .contains("missing secret"));
        assert!(!TaskdeskError::unknown("x").is_client_error());
    }
}
