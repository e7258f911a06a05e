use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::gemini::HighlightGenerator;
use crate::models::AnalysisResult;
use crate::youtube::{MetadataFetcher, TranscriptFetcher, extract_video_id};

// Stage names reported through the progress callback
pub const STAGE_METADATA: &str = "metadata";
pub const STAGE_TRANSCRIPT: &str = "transcript";
pub const STAGE_HIGHLIGHTS: &str = "highlights";
pub const STAGES: [&str; 3] = [STAGE_METADATA, STAGE_TRANSCRIPT, STAGE_HIGHLIGHTS];

// Receives stage completions while an analysis runs; the job tracker wires
// this into poll snapshots
pub trait StageProgress: Send + Sync {
    fn stage_done(&self, stage: &str);
}

// For callers that do not track progress (the sync endpoint)
pub struct NoProgress;

impl StageProgress for NoProgress {
    fn stage_done(&self, _stage: &str) {}
}

pub struct AnalysisPipeline {
    metadata: Arc<dyn MetadataFetcher>,
    transcript: Arc<dyn TranscriptFetcher>,
    generator: Arc<dyn HighlightGenerator>,
}

impl AnalysisPipeline {
    pub fn new(
        metadata: Arc<dyn MetadataFetcher>,
        transcript: Arc<dyn TranscriptFetcher>,
        generator: Arc<dyn HighlightGenerator>,
    ) -> Self {
        Self {
            metadata,
            transcript,
            generator,
        }
    }

    // Full analysis: url -> id -> metadata + transcript -> highlights.
    // Only URL validation can fail; the collaborators degrade internally.
    pub async fn analyze(
        &self,
        url: &str,
        progress: &dyn StageProgress,
    ) -> Result<AnalysisResult, ApiError> {
        let video_id = extract_video_id(url)?;
        info!(%video_id, "analysis started");

        let metadata = self.metadata.fetch(&video_id).await;
        progress.stage_done(STAGE_METADATA);

        let transcript = self.transcript.fetch(&video_id).await;
        progress.stage_done(STAGE_TRANSCRIPT);

        let highlights = self
            .generator
            .generate(&transcript, &metadata.title, &metadata.duration)
            .await;
        progress.stage_done(STAGE_HIGHLIGHTS);

        info!(%video_id, highlights = highlights.len(), "analysis finished");
        Ok(AnalysisResult {
            title: metadata.title,
            duration: metadata.duration,
            thumbnail_url: metadata.thumbnail_url,
            highlights,
            status: "Success".to_string(),
        })
    }
}
