use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::jobs::JobTracker;
use crate::pipeline::AnalysisPipeline;
use crate::rate_limit::RateLimiter;

// App's shared state
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub jobs: Arc<JobTracker>,
    pub cache: ResultCache,
    pub pipeline: Arc<AnalysisPipeline>,
    pub analysis_timeout: Duration,  // bound on the sync analyze path
    pub job_retention_seconds: i64,  // reaper threshold
}
