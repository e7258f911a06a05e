use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

// Everything a handler can fail with; maps 1:1 onto HTTP statuses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded")]
    RateLimited {
        retry_after: i64,
        remaining: u32,
        reset_time: i64,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Analysis queue is full")]
    QueueFull,

    #[error("Analysis timed out after {0} seconds")]
    TimedOut(u64),

    // Collaborator failures degrade to fallbacks below the handler boundary,
    // so the only unexpected-failure kind left is this catch-all
    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(detail) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": detail })),
            )
                .into_response(),
            ApiError::RateLimited {
                retry_after,
                remaining,
                reset_time,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Rate limit exceeded",
                    "detail": format!("Too many requests. Try again in {retry_after} seconds."),
                    "retry_after": retry_after,
                    "remaining_requests": remaining,
                    "reset_time": reset_time,
                })),
            )
                .into_response(),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{what} not found") })),
            )
                .into_response(),
            ApiError::QueueFull => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Analysis queue is full",
                    "detail": "Too many analyses in flight. Retry shortly.",
                })),
            )
                .into_response(),
            ApiError::TimedOut(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({
                    "error": "Analysis timed out",
                    "detail": format!("Upstream did not answer within {secs} seconds."),
                })),
            )
                .into_response(),
            // Detail stays in the log, not the response
            ApiError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
