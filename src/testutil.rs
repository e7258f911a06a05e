// Shared mock collaborators for unit tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::gemini::{HighlightGenerator, fallback_highlights};
use crate::models::{Highlight, VideoMetadata};
use crate::pipeline::AnalysisPipeline;
use crate::youtube::{MetadataFetcher, TranscriptFetcher};

pub const SAMPLE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub struct StaticMetadata;

#[async_trait]
impl MetadataFetcher for StaticMetadata {
    async fn fetch(&self, video_id: &str) -> VideoMetadata {
        VideoMetadata {
            title: "Sample Video Title".to_string(),
            duration: "10:30".to_string(),
            thumbnail_url: format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg"),
        }
    }
}

pub struct StaticTranscript;

#[async_trait]
impl TranscriptFetcher for StaticTranscript {
    async fn fetch(&self, _video_id: &str) -> String {
        "a transcript about technology".to_string()
    }
}

// Counts calls and optionally stalls, for cache and timeout tests
pub struct CountingGenerator {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl CountingGenerator {
    pub fn instant() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl HighlightGenerator for CountingGenerator {
    async fn generate(&self, _transcript: &str, _title: &str, _duration: &str) -> Vec<Highlight> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        fallback_highlights()
    }
}

pub fn static_pipeline() -> AnalysisPipeline {
    pipeline_with(Arc::new(CountingGenerator::instant()))
}

pub fn pipeline_with(generator: Arc<CountingGenerator>) -> AnalysisPipeline {
    AnalysisPipeline::new(Arc::new(StaticMetadata), Arc::new(StaticTranscript), generator)
}
