use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use railbook_core::store::StoreError;
use railbook_core::BookingError;

/// HTTP-facing error shape. Every variant carries a stable `code` string so
/// clients can branch (retry vs. give up vs. show "sold out") without
/// parsing messages.
#[derive(Debug)]
pub enum AppError {
    Authentication(String),
    Authorization(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    SoldOut,
    TransientConflict,
    Internal(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::TrainNotFound => AppError::NotFound("Train not found".to_string()),
            BookingError::NoSeatsAvailable => AppError::SoldOut,
            BookingError::ConflictRetryExhausted => AppError::TransientConflict,
            BookingError::Store(StoreError::Conflict) => AppError::TransientConflict,
            BookingError::Store(StoreError::Unavailable(msg)) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, "unauthenticated", msg),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::SoldOut => (
                StatusCode::CONFLICT,
                "no_seats_available",
                "No seats available".to_string(),
            ),
            AppError::TransientConflict => (
                StatusCode::SERVICE_UNAVAILABLE,
                "transient_conflict",
                "Concurrent booking conflict, please retry".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
