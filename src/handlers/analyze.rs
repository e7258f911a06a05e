use axum::{Extension, Json, extract::State};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::error::ApiError;
use crate::metrics::{ANALYSIS_LATENCY, CACHE_HITS, CACHE_MISSES, REQUEST_TOTAL};
use crate::middleware::DeviceId;
use crate::models::{AnalyzeRequest, AnalyzeResponse};
use crate::pipeline::NoProgress;
use crate::rate_limit::device_prefix;
use crate::state::AppState;
use crate::youtube::extract_video_id;

// Synchronous analysis: answer from the per-device cache when possible,
// otherwise run the full pipeline inline under the analysis timeout.
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Extension(DeviceId(device_id)): Extension<DeviceId>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    REQUEST_TOTAL.inc();
    let video_id = extract_video_id(&payload.url)?;

    if let Some(result) = state.cache.get(&device_id, &video_id) {
        CACHE_HITS.inc();
        info!(device = %device_prefix(&device_id), %video_id, "returning cached analysis");
        return Ok(Json(AnalyzeResponse::completed(result)));
    }
    CACHE_MISSES.inc();
    info!(device = %device_prefix(&device_id), %video_id, "starting analysis");

    let started = Instant::now();
    let result = tokio::time::timeout(
        state.analysis_timeout,
        state.pipeline.analyze(&payload.url, &NoProgress),
    )
    .await
    .map_err(|_| ApiError::TimedOut(state.analysis_timeout.as_secs()))??;
    ANALYSIS_LATENCY.observe(started.elapsed().as_secs_f64());

    state.cache.insert(&device_id, &video_id, result.clone());
    Ok(Json(AnalyzeResponse::completed(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::jobs::JobTracker;
    use crate::middleware::device_auth;
    use crate::rate_limit::{RateLimiter, default_rules};
    use crate::testutil::{CountingGenerator, SAMPLE_URL, pipeline_with};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tower::ServiceExt;

    const DEVICE: &str = "test-device-12345678901234567890";

    fn test_app(generator: Arc<CountingGenerator>) -> Router {
        let pipeline = Arc::new(pipeline_with(generator));
        let jobs = JobTracker::start(Arc::clone(&pipeline), 0, 16, Duration::from_secs(30));
        let state = Arc::new(AppState {
            rate_limiter: RateLimiter::new(default_rules()),
            jobs,
            cache: ResultCache::new(Duration::from_secs(60)),
            pipeline,
            analysis_timeout: Duration::from_secs(30),
            job_retention_seconds: 3600,
        });
        Router::new()
            .route("/api/analyze", post(analyze_handler))
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&state),
                device_auth,
            ))
            .with_state(state)
    }

    fn analyze_request(url: &str) -> HttpRequest<Body> {
        HttpRequest::post("/api/analyze")
            .header("X-Device-ID", DEVICE)
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"url":"{url}"}}"#)))
            .unwrap()
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn returns_result_with_agents_array() {
        let app = test_app(Arc::new(CountingGenerator::instant()));
        let res = app.oneshot(analyze_request(SAMPLE_URL)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["status"], "Success");
        assert_eq!(body["title"], "Sample Video Title");
        assert!(body["thumbnailUrl"].as_str().unwrap().contains("dQw4w9WgXcQ"));
        assert_eq!(body["agents"].as_array().unwrap().len(), 3);
        assert!(!body["highlights"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let generator = Arc::new(CountingGenerator::instant());
        let app = test_app(Arc::clone(&generator));

        let first = app
            .clone()
            .oneshot(analyze_request(SAMPLE_URL))
            .await
            .unwrap();
        let second = app.oneshot(analyze_request(SAMPLE_URL)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(body_json(first).await, body_json(second).await);
    }

    #[tokio::test]
    async fn invalid_url_is_a_bad_request() {
        let app = test_app(Arc::new(CountingGenerator::instant()));
        let res = app.oneshot(analyze_request("not a video")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
