use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use error_types::{error_codes, ErrorResponse};

/// Map domain errors to HTTP responses.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::InvalidOperation(_) => ("validation_error", error_codes::INVALID_OPERATION),
        AppError::NotFound => ("not_found_error", error_codes::SESSION_NOT_FOUND),
        AppError::Forbidden => ("authorization_error", error_codes::NOT_SESSION_PARTICIPANT),
        AppError::Unavailable(_) => (
            "service_unavailable_error",
            error_codes::STORAGE_UNAVAILABLE,
        ),
        AppError::Database(_) if err.is_retryable() => (
            "service_unavailable_error",
            error_codes::STORAGE_UNAVAILABLE,
        ),
        AppError::Database(_) => ("server_error", error_codes::DATABASE_ERROR),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            ("server_error", error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    let message = err.to_string();
    let response = ErrorResponse::new(
        match status {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        },
        &message,
        status.as_u16(),
        error_type,
        code,
    );

    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}
