use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::models::VideoMetadata;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

pub const FALLBACK_TRANSCRIPT: &str = "This is a sample video transcript for demonstration \
purposes. The video contains educational content about technology and programming.";

lazy_static! {
    static ref VIDEO_ID_RE: Regex =
        Regex::new(r"(?:v=|/embed/|/v/|youtu\.be/|/watch\?v=)([a-zA-Z0-9_-]{11})").unwrap();
}

// Pulls the 11-char video id out of the supported URL forms
pub fn extract_video_id(url: &str) -> Result<String, ApiError> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ApiError::Validation("Invalid YouTube URL format.".to_string()))
}

// Both fetchers are total: they degrade to placeholders instead of erroring
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> VideoMetadata;
}

#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> String;
}

pub struct YoutubeClient {
    client: reqwest::Client,
}

impl YoutubeClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct OembedResponse {
    title: String,
}

fn placeholder_metadata(video_id: &str) -> VideoMetadata {
    VideoMetadata {
        title: "Sample Video Title".to_string(),
        duration: "10:30".to_string(),
        thumbnail_url: format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg"),
    }
}

#[async_trait]
impl MetadataFetcher for YoutubeClient {
    async fn fetch(&self, video_id: &str) -> VideoMetadata {
        let url = format!(
            "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={video_id}&format=json"
        );
        let response = self
            .client
            .get(&url)
            .timeout(UPSTREAM_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(res) if res.status().is_success() => match res.json::<OembedResponse>().await {
                Ok(data) => {
                    info!(%video_id, title = %data.title, "fetched oEmbed metadata");
                    VideoMetadata {
                        title: data.title,
                        ..placeholder_metadata(video_id)
                    }
                }
                Err(e) => {
                    warn!(%video_id, error = %e, "oEmbed body did not parse, using placeholder");
                    placeholder_metadata(video_id)
                }
            },
            Ok(res) => {
                warn!(%video_id, status = %res.status(), "oEmbed request rejected, using placeholder");
                placeholder_metadata(video_id)
            }
            Err(e) => {
                warn!(%video_id, error = %e, "oEmbed request failed, using placeholder");
                placeholder_metadata(video_id)
            }
        }
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeClient {
    async fn fetch(&self, video_id: &str) -> String {
        for lang in ["en", "en-US", "en-GB"] {
            let url = format!("https://video.google.com/timedtext?lang={lang}&v={video_id}");
            let response = self
                .client
                .get(&url)
                .timeout(UPSTREAM_TIMEOUT)
                .send()
                .await;
            match response {
                Ok(res) if res.status().is_success() => {
                    if let Ok(body) = res.text().await {
                        let text = caption_text(&body);
                        if !text.is_empty() {
                            info!(%video_id, lang, chars = text.len(), "fetched transcript");
                            return text;
                        }
                    }
                    debug!(%video_id, lang, "no captions for language");
                }
                Ok(res) => debug!(%video_id, lang, status = %res.status(), "timedtext rejected"),
                Err(e) => debug!(%video_id, lang, error = %e, "timedtext request failed"),
            }
        }
        warn!(%video_id, "no captions available, using placeholder transcript");
        FALLBACK_TRANSCRIPT.to_string()
    }
}

// Timedtext bodies are flat XML; pull the text nodes and decode the common entities
fn caption_text(xml: &str) -> String {
    let mut raw = String::new();
    let mut in_tag = false;
    for c in xml.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                raw.push(' ');
            }
            c if !in_tag => raw.push(c),
            _ => {}
        }
    }
    let decoded = raw
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
