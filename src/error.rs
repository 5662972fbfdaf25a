use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    TooManyRequests,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query timed out: {0}")]
    Timeout(&'static str),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Infrastructure failures are opaque to clients
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Timeout(_) | AppError::Internal(_)
        )
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => {
                let body = Json(json!({
                    "error": "bad_request",
                    "message": message,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            AppError::TooManyRequests => {
                let body = Json(json!({
                    "error": "too_many_requests",
                    "message": "Rate limit exceeded",
                }));
                (StatusCode::TOO_MANY_REQUESTS, body).into_response()
            }
            AppError::Timeout(operation) => {
                tracing::error!(operation, "Database query timed out");
                let body = Json(json!({
                    "error": "timeout",
                    "message": "Upstream query timed out",
                }));
                (StatusCode::GATEWAY_TIMEOUT, body).into_response()
            }
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database error");
                internal_error_response()
            }
            AppError::Internal(ref msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal_error_response()
            }
        }
    }
}

fn internal_error_response() -> Response {
    let body = Json(json!({
        "error": "internal_error",
        "message": "Internal server error",
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

pub type AppResult<T> = Result<T, AppError>;
