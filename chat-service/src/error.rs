use crate::middleware::error_handling;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_handling::into_response(self).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Caller asked for something the domain forbids (self-chat,
    /// empty message).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("session not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    /// Backing service outage (non-sqlx stores map transient faults here).
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Whether the caller may retry (transient storage faults). The
    /// create path is idempotent by key; message appends are only
    /// retry-safe with an idempotency key.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            AppError::Unavailable(_) => true,
            _ => false,
        }
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidOperation(_) => 400,
            AppError::Forbidden => 403,
            AppError::NotFound => 404,
            AppError::Unavailable(_) => 503,
            AppError::Database(_) if self.is_retryable() => 503,
            _ => 500,
        }
    }
}
