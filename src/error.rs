//! Error types for the parish CMS.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes for the CLI (2=db, 3=not_found, 4=validation, ...)
//! - HTTP status mapping for the REST layer
//! - Context-aware recovery hints
//! - Structured JSON output shared by the CLI and the API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for parish CMS operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    DatabaseError,

    // Not Found (exit 3)
    MonthNotFound,
    ContentNotFound,
    AboutSectionNotFound,

    // Validation (exit 4)
    ValidationFailed,
    InvalidArgument,

    // Conflict (exit 5)
    MonthExists,

    // Auth (exit 6)
    Unauthorized,

    // Config (exit 7)
    ConfigError,

    // I/O and transport (exit 8)
    IoError,
    JsonError,
    NetworkError,
    ApiError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::MonthNotFound => "MONTH_NOT_FOUND",
            Self::ContentNotFound => "CONTENT_NOT_FOUND",
            Self::AboutSectionNotFound => "ABOUT_SECTION_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::MonthExists => "MONTH_EXISTS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ApiError => "API_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::DatabaseError => 2,
            Self::MonthNotFound | Self::ContentNotFound | Self::AboutSectionNotFound => 3,
            Self::ValidationFailed | Self::InvalidArgument => 4,
            Self::MonthExists => 5,
            Self::Unauthorized => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::NetworkError | Self::ApiError => 8,
        }
    }

    /// Whether the caller can succeed by retrying (possibly with corrected input).
    ///
    /// True for validation errors and transient transport failures. The
    /// admin client never retries on its own; this only drives hints.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::InvalidArgument
                | Self::NetworkError
                | Self::DatabaseError
        )
    }

    /// HTTP status used when this code is returned from the REST layer.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::MonthNotFound | Self::ContentNotFound | Self::AboutSectionNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::ValidationFailed | Self::InvalidArgument | Self::JsonError => {
                StatusCode::BAD_REQUEST
            }
            Self::MonthExists => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NetworkError | Self::ApiError => StatusCode::BAD_GATEWAY,
            Self::NotInitialized
            | Self::DatabaseError
            | Self::ConfigError
            | Self::IoError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in parish CMS operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database not found at {path}: run `parish migrate` first")]
    NotInitialized { path: PathBuf },

    #[error("Intention month not found: {id}")]
    MonthNotFound { id: i64 },

    #[error("Intentions for {year}-{month:02} already exist")]
    MonthExists { year: i32, month: u32 },

    #[error("{kind} not found: {id}")]
    ContentNotFound { kind: &'static str, id: i64 },

    #[error("About section not found: {key}")]
    AboutSectionNotFound { key: String, similar: Vec<String> },

    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Missing or invalid admin token")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server responded {status}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Other(format!("Unexpected response body: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::MonthNotFound { .. } => ErrorCode::MonthNotFound,
            Self::MonthExists { .. } => ErrorCode::MonthExists,
            Self::ContentNotFound { .. } => ErrorCode::ContentNotFound,
            Self::AboutSectionNotFound { .. } => ErrorCode::AboutSectionNotFound,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Api { .. } => ErrorCode::ApiError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { path } => Some(format!(
                "Create the database with `parish migrate --db {}`",
                path.display()
            )),
            Self::MonthExists { .. } => Some(
                "Another save created this month first. Reload the month list and save again."
                    .to_string(),
            ),
            Self::MonthNotFound { .. } => {
                Some("The month was removed. Reload the month list.".to_string())
            }
            Self::AboutSectionNotFound { similar, .. } if !similar.is_empty() => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }
            Self::Unauthorized => Some(
                "Set PARISH_ADMIN_TOKEN (or pass --admin-token) to the server's admin token"
                    .to_string(),
            ),
            Self::Network(_) => Some(
                "Check that `parish serve` is running and PARISH_API_URL points at it".to_string(),
            ),
            Self::Validation(_) => {
                Some("Dates use YYYY-MM-DD, times use HH:MM (24h)".to_string())
            }
            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, optional
    /// recovery hint and field-level validation messages.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        if let Self::Validation(fields) = self {
            obj["error"]["fields"] = serde_json::to_value(fields).unwrap_or_default();
        }

        obj
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.error_code().http_status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            // Internal details stay in the log.
            let body = serde_json::json!({
                "error": {
                    "code": self.error_code().as_str(),
                    "message": "Internal server error",
                    "retryable": self.error_code().is_retryable(),
                }
            });
            return (status, axum::Json(body)).into_response();
        }
        (status, axum::Json(self.to_structured_json())).into_response()
    }
}
