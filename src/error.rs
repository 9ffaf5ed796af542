use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error codes carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Unauthorized,
    Forbidden,
    DuplicateEntry,
    UserExists,
    InvalidCredentials,
    DailyLimitExceeded,
    SetLimitExceeded,
    RateLimited,
    AlreadySummarized,
    GenerationInProgress,
    Timeout,
    ServiceUnavailable,
    Storage,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "validation",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::DuplicateEntry => "duplicate_entry",
            ErrorCode::UserExists => "user_exists",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::DailyLimitExceeded => "daily_limit_exceeded",
            ErrorCode::SetLimitExceeded => "set_limit_exceeded",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::AlreadySummarized => "already_summarized",
            ErrorCode::GenerationInProgress => "generation_in_progress",
            ErrorCode::Timeout => "timeout",
            ErrorCode::ServiceUnavailable => "service_unavailable",
            ErrorCode::Storage => "storage",
            ErrorCode::Unknown => "unknown",
        }
    }
}

/// Wire shape of every API error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: ErrorCode,
}

pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An entry with these values already exists")]
    DuplicateEntry,

    #[error("An account with this email already exists")]
    UserExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Daily session limit reached")]
    DailyLimitExceeded,

    #[error("Set limit reached for this session")]
    SetLimitExceeded,

    #[error("This session already has a summary")]
    AlreadySummarized,

    #[error("A summary is already being generated")]
    GenerationInProgress,

    #[error("Summary generation timed out")]
    Timeout,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Password hash error")]
    PasswordHash,
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        classify_store_error(&err.to_string()).unwrap_or(AppError::Database(err))
    }
}

/// Map known store failure messages (constraint and trigger text) to
/// application errors.
pub fn classify_store_error(message: &str) -> Option<AppError> {
    if message.contains("daily session limit reached") {
        Some(AppError::DailyLimitExceeded)
    } else if message.contains("session set limit reached") {
        Some(AppError::SetLimitExceeded)
    } else if message.contains("UNIQUE constraint failed: users.email") {
        Some(AppError::UserExists)
    } else if message.contains("UNIQUE constraint failed") {
        Some(AppError::DuplicateEntry)
    } else if message.contains("CHECK constraint failed") {
        Some(AppError::Validation("Value out of range".to_string()))
    } else if message.contains("FOREIGN KEY constraint failed") {
        Some(AppError::NotFound("Referenced record not found".to_string()))
    } else {
        None
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::Validation(_) => ErrorCode::Validation,
            AppError::DuplicateEntry => ErrorCode::DuplicateEntry,
            AppError::UserExists => ErrorCode::UserExists,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::DailyLimitExceeded => ErrorCode::DailyLimitExceeded,
            AppError::SetLimitExceeded => ErrorCode::SetLimitExceeded,
            AppError::AlreadySummarized => ErrorCode::AlreadySummarized,
            AppError::GenerationInProgress => ErrorCode::GenerationInProgress,
            AppError::Timeout => ErrorCode::Timeout,
            AppError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_)
            | AppError::PasswordHash => ErrorCode::Unknown,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry
            | AppError::UserExists
            | AppError::AlreadySummarized
            | AppError::GenerationInProgress => StatusCode::CONFLICT,
            AppError::DailyLimitExceeded | AppError::SetLimitExceeded => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_)
            | AppError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message; internal failures collapse to a generic one.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Validation(msg) => msg.clone(),
            AppError::ServiceUnavailable(_) => "Summary service unavailable".to_string(),
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_)
            | AppError::PasswordHash => GENERIC_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Pool(e) => tracing::error!("Pool error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::PasswordHash => tracing::error!("Password hash error"),
            AppError::ServiceUnavailable(msg) => tracing::warn!("Summary service error: {}", msg),
            _ => {}
        }

        let body = ErrorBody {
            message: self.public_message(),
            code: self.code(),
        };

        (self.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
