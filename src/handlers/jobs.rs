use axum::{Extension, Json, extract::Path, extract::State};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::jobs::Job;
use crate::metrics::REQUEST_TOTAL;
use crate::middleware::DeviceId;
use crate::models::AnalyzeRequest;
use crate::rate_limit::device_prefix;
use crate::state::AppState;
use crate::youtube::extract_video_id;

// Async analysis: validates the URL, registers a job, and returns the handle
// for polling. Old jobs are reaped opportunistically before admitting work.
pub async fn start_analysis_handler(
    State(state): State<Arc<AppState>>,
    Extension(DeviceId(device_id)): Extension<DeviceId>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    REQUEST_TOTAL.inc();
    state.jobs.reap(state.job_retention_seconds);

    extract_video_id(&payload.url)?;
    let job_id = state.jobs.create(&payload.url)?;
    info!(device = %device_prefix(&device_id), %job_id, "started async analysis");

    Ok(Json(json!({
        "job_id": job_id,
        "status": "pending",
        "message": "Analysis started successfully",
    })))
}

// Current snapshot of one job; 404 once it is unknown or reaped
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    REQUEST_TOTAL.inc();
    Ok(Json(state.jobs.poll(&job_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::jobs::JobTracker;
    use crate::middleware::device_auth;
    use crate::rate_limit::{RateLimiter, default_rules};
    use crate::testutil::{SAMPLE_URL, static_pipeline};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::{get, post};
    use std::time::Duration;
    use tower::ServiceExt;

    const DEVICE: &str = "test-device-12345678901234567890";

    fn test_app() -> Router {
        let pipeline = Arc::new(static_pipeline());
        let jobs = JobTracker::start(Arc::clone(&pipeline), 1, 16, Duration::from_secs(30));
        let state = Arc::new(AppState {
            rate_limiter: RateLimiter::new(default_rules()),
            jobs,
            cache: ResultCache::new(Duration::from_secs(60)),
            pipeline,
            analysis_timeout: Duration::from_secs(30),
            job_retention_seconds: 3600,
        });
        Router::new()
            .route("/api/analysis/start", post(start_analysis_handler))
            .route("/api/analysis/progress/{job_id}", get(progress_handler))
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&state),
                device_auth,
            ))
            .with_state(state)
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn start_then_poll_until_completed() {
        let app = test_app();
        let res = app
            .clone()
            .oneshot(
                HttpRequest::post("/api/analysis/start")
                    .header("X-Device-ID", DEVICE)
                    .header("content-type", "application/json")
                    .body(Body::from(format!(r#"{{"url":"{SAMPLE_URL}"}}"#)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert_eq!(body["status"], "pending");

        // Stay under the 30/60s progress rule while polling
        for _ in 0..25 {
            let res = app
                .clone()
                .oneshot(
                    HttpRequest::get(format!("/api/analysis/progress/{job_id}"))
                        .header("X-Device-ID", DEVICE)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            let snapshot = body_json(res).await;
            match snapshot["status"].as_str().unwrap() {
                "completed" => {
                    assert!(snapshot["result"].is_object());
                    assert!(snapshot["error"].is_null());
                    return;
                }
                "failed" => panic!("job failed: {snapshot}"),
                _ => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        panic!("job never completed");
    }

    #[tokio::test]
    async fn unknown_job_is_a_404() {
        let app = test_app();
        let res = app
            .oneshot(
                HttpRequest::get("/api/analysis/progress/no-such-job")
                    .header("X-Device-ID", DEVICE)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_url_never_creates_a_job() {
        let app = test_app();
        let res = app
            .oneshot(
                HttpRequest::post("/api/analysis/start")
                    .header("X-Device-ID", DEVICE)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url":"nope"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
