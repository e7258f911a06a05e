use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("highlights_requests_total", "Total number of API requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "highlights_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("highlights_cache_hits_total", "Total analysis cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("highlights_cache_misses_total", "Total analysis cache misses").unwrap();
    pub static ref ANALYSIS_LATENCY: Histogram = register_histogram!(
        "highlights_analysis_latency_seconds",
        "End-to-end analysis latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge = register_gauge!(
        "highlights_cache_size",
        "Current number of cached analyses"
    )
    .unwrap();
    pub static ref JOBS_ACTIVE: Gauge = register_gauge!(
        "highlights_jobs_active",
        "Jobs currently held by the tracker"
    )
    .unwrap();
}
