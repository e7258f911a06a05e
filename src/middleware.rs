use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::rate_limit::device_prefix;
use crate::state::AppState;

// UUID-style identifiers are longer than this
const MIN_DEVICE_ID_LEN: usize = 10;

// No device auth for probes and scrapes
const EXEMPT_PREFIXES: [&str; 2] = ["/health", "/metrics"];

// The authenticated device id, available to handlers as an extension
#[derive(Clone)]
pub struct DeviceId(pub String);

// Requires X-Device-ID on /api routes and applies the rate limiter before
// the request reaches a handler. Allowed requests get quota headers.
pub async fn device_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return next.run(request).await;
    }

    let device_id = request
        .headers()
        .get("X-Device-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let Some(device_id) = device_id else {
        warn!(%path, "missing device id");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Device ID required",
                "detail": "Include X-Device-ID header with a valid device identifier",
            })),
        )
            .into_response();
    };
    if device_id.chars().count() < MIN_DEVICE_ID_LEN {
        warn!(device = %device_prefix(&device_id), "invalid device id format");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Invalid device ID format",
                "detail": "Device ID must be a valid identifier",
            })),
        )
            .into_response();
    }

    let decision = state.rate_limiter.check(&device_id, &path);
    if !decision.allowed {
        RATE_LIMITED_TOTAL.inc();
        return ApiError::RateLimited {
            retry_after: (decision.reset_time - Utc::now().timestamp()).max(0),
            remaining: decision.remaining,
            reset_time: decision.reset_time,
        }
        .into_response();
    }

    request.extensions_mut().insert(DeviceId(device_id));
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&decision.reset_time.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
    response
}
