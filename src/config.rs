use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "highlights-api")]
#[command(about = "Backend API for AI-generated video highlights")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    // Gemini API key; startup fails without it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    // Generative model to call
    #[arg(long, default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    // Analysis result cache TTL in seconds
    #[arg(long, default_value_t = 3600)]
    pub cache_ttl: u64,

    // How long finished or stuck jobs are kept before the reaper drops them
    #[arg(long, default_value_t = 3600)]
    pub job_retention: u64,

    // Size of the analysis worker pool
    #[arg(long, default_value_t = 4)]
    pub job_workers: usize,

    // Queued-job capacity; creates beyond this are rejected
    #[arg(long, default_value_t = 100)]
    pub job_queue_capacity: usize,

    // Upstream analysis timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub analysis_timeout: u64,

    // Janitor sweep interval in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,
}
