//! Mapping of failures to HTTP responses

use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use taskdesk_core::TaskdeskError;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] TaskdeskError),

    /// Missing, malformed or expired credentials
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    /// Unreadable or oversized multipart body
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// Report generation failed; the label names the format, e.g. `PDF`
    #[error("Error generating {0}")]
    Report(&'static str),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::BadRequest(message) => json_error(StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => json_error(StatusCode::NOT_FOUND, message),
            Self::Multipart(err) => {
                debug!("Upload rejected: {}", err);
                json_error(err.status(), err.body_text())
            }
            Self::Report(label) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("Error generating {label}"),
            )
                .into_response(),
            Self::Core(err) => core_error_response(err),
        }
    }
}

fn core_error_response(err: TaskdeskError) -> Response {
    if err.is_client_error() {
        debug!("Request rejected: {}", err);
    } else {
        error!("Request failed: {}", err);
    }
    match err {
        TaskdeskError::InvalidInput(fields) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid input", "fields": fields })),
        )
            .into_response(),
        TaskdeskError::Validation { message } => json_error(StatusCode::BAD_REQUEST, message),
        TaskdeskError::TaskNotFound { .. } => json_error(StatusCode::NOT_FOUND, "Task not found"),
        TaskdeskError::UserNotFound { .. } => json_error(StatusCode::NOT_FOUND, "User not found"),
        TaskdeskError::DuplicateUser { .. } => json_error(
            StatusCode::CONFLICT,
            "A user with that username already exists.",
        ),
        TaskdeskError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "Invalid username or password")
        }
        TaskdeskError::InvalidToken { .. } => {
            json_error(StatusCode::UNAUTHORIZED, "Authentication required")
        }
        _ => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error occurred while processing the request",
        ),
    }
}
