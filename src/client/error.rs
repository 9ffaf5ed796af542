use std::time::Duration;
use thiserror::Error;

use crate::error::{AppError, ErrorBody, ErrorCode, GENERIC_ERROR_MESSAGE};

/// Uniform client error: a user-facing message plus an application code.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
    pub code: ErrorCode,
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn unknown() -> Self {
        Self::new(ErrorCode::Unknown, GENERIC_ERROR_MESSAGE)
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        let minutes = retry_after.as_secs().div_ceil(60).max(1);
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        Self::new(
            ErrorCode::RateLimited,
            format!(
                "Too many sign-in attempts. Try again in {} {}.",
                minutes, unit
            ),
        )
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, "The request timed out. Please try again.")
    }

    pub fn storage(detail: impl std::fmt::Display) -> Self {
        tracing::warn!("Local storage error: {}", detail);
        Self::new(ErrorCode::Storage, "Could not save local data")
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        Self::new(err.code(), err.public_message())
    }
}

impl From<ErrorBody> for ClientError {
    fn from(body: ErrorBody) -> Self {
        Self::new(body.code, body.message)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        tracing::warn!("Request failed: {}", err);
        if err.is_timeout() {
            Self::timeout()
        } else {
            Self::unknown()
        }
    }
}
