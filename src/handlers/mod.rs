mod analyze;
mod health;
mod jobs;
mod metrics;

pub use analyze::analyze_handler;
pub use health::health_handler;
pub use jobs::{progress_handler, start_analysis_handler};
pub use metrics::metrics_handler;
