mod cache;
mod config;
mod error;
mod gemini;
mod handlers;
mod jobs;
mod metrics;
mod middleware;
mod models;
mod pipeline;
mod rate_limit;
mod state;
#[cfg(test)]
mod testutil;
mod youtube;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cache::ResultCache;
use crate::config::Args;
use crate::gemini::{GeminiGenerator, HighlightGenerator};
use crate::handlers::{analyze_handler, health_handler, metrics_handler, progress_handler, start_analysis_handler};
use crate::jobs::JobTracker;
use crate::middleware::device_auth;
use crate::pipeline::AnalysisPipeline;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;
use crate::youtube::{MetadataFetcher, TranscriptFetcher, YoutubeClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Exits here when GEMINI_API_KEY is missing; the generator is a hard
    // requirement, everything else degrades at runtime
    let args = Args::parse();

    let client = reqwest::Client::new();
    let youtube = Arc::new(YoutubeClient::new(client.clone()));
    // One client serves both fetcher seams; coerce to the trait objects here
    let metadata: Arc<dyn MetadataFetcher> = youtube.clone();
    let transcript: Arc<dyn TranscriptFetcher> = youtube;
    let generator: Arc<dyn HighlightGenerator> = Arc::new(GeminiGenerator::new(
        client,
        args.gemini_api_key.clone(),
        args.gemini_model.clone(),
    ));
    let pipeline = Arc::new(AnalysisPipeline::new(metadata, transcript, generator));

    let analysis_timeout = Duration::from_secs(args.analysis_timeout);
    let jobs = JobTracker::start(
        Arc::clone(&pipeline),
        args.job_workers,
        args.job_queue_capacity,
        analysis_timeout,
    );

    let state = Arc::new(AppState {
        rate_limiter: RateLimiter::new(rate_limit::default_rules()),
        jobs,
        cache: ResultCache::new(Duration::from_secs(args.cache_ttl)),
        pipeline,
        analysis_timeout,
        job_retention_seconds: args.job_retention as i64,
    });

    // Janitor: reap old jobs and drop stale rate-limit / cache entries
    let janitor_state = Arc::clone(&state);
    let sweep_interval = Duration::from_secs(args.sweep_interval.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            janitor_state.jobs.reap(janitor_state.job_retention_seconds);
            janitor_state
                .rate_limiter
                .sweep_expired(chrono::Utc::now().timestamp());
            janitor_state.cache.sweep_expired();
        }
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/analysis/start", post(start_analysis_handler))
        .route("/api/analysis/progress/{job_id}", get(progress_handler))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            device_auth,
        ))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(
        port = args.port,
        model = %args.gemini_model,
        workers = args.job_workers,
        "highlights api listening"
    );
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server exited");
        std::process::exit(1);
    }
}
