use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::models::{Agent, Highlight};

// Transcript clamp keeps the prompt inside the model context
const TRANSCRIPT_LIMIT: usize = 12000;

// Total by contract: generation failures fall back to a fixed highlight set
#[async_trait]
pub trait HighlightGenerator: Send + Sync {
    async fn generate(&self, transcript: &str, title: &str, duration: &str) -> Vec<Highlight>;
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        info!(model = %model, "generation client initialized");
        Self {
            client,
            api_key,
            model,
        }
    }

    // The key travels as a query parameter, per the API convention
    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }
}

#[async_trait]
impl HighlightGenerator for GeminiGenerator {
    async fn generate(&self, transcript: &str, title: &str, _duration: &str) -> Vec<Highlight> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(transcript, title) }] }]
        });
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await;

        let value: Value = match response {
            Ok(res) if res.status().is_success() => match res.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "generation response did not parse, using fallback set");
                    return fallback_highlights();
                }
            },
            Ok(res) => {
                warn!(status = %res.status(), "generation request rejected, using fallback set");
                return fallback_highlights();
            }
            Err(e) => {
                warn!(error = %e, "generation request failed, using fallback set");
                return fallback_highlights();
            }
        };

        let text = value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match parse_highlights(text) {
            Some(highlights) if !highlights.is_empty() => {
                info!(count = highlights.len(), "generated highlights");
                highlights
            }
            _ => {
                warn!("generation output was not valid highlight JSON, using fallback set");
                fallback_highlights()
            }
        }
    }
}

pub(crate) fn build_prompt(transcript: &str, title: &str) -> String {
    let clipped: String = transcript.chars().take(TRANSCRIPT_LIMIT).collect();
    format!(
        r#"You are an AI Manager overseeing three specialized agents: 'The Teacher', 'The Analyst', and 'The Explorer'.

Your task is to review the video transcript and synthesize their findings into 5-7 key highlights.

Agent Roles:
- **The Teacher**: Find important conceptual, educational, or learning moments
- **The Analyst**: Find important data points, metrics, statistics, or technical details
- **The Explorer**: Find important resources, next steps, features, or actionable insights

Video Title: {title}

--- TRANSCRIPT ---
{clipped}

--- INSTRUCTIONS ---
Return 5-7 highlights as a JSON array. Each highlight must have:
- "agent": The agent name ("The Teacher", "The Analyst", or "The Explorer")
- "timestamp": A realistic timestamp from the video (e.g., "02:35")
- "title": A concise, descriptive title (4-8 words)
- "description": A complete explanation (3-4 sentences) with specific details from the video

Focus on the most valuable, actionable, and interesting moments. Ensure descriptions are complete and informative.

Return only valid JSON, no other text.
"#
    )
}

// Models sometimes wrap the JSON in markdown fences
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

pub(crate) fn parse_highlights(text: &str) -> Option<Vec<Highlight>> {
    serde_json::from_str(strip_code_fences(text)).ok()
}

// Fixed set returned when generation is unavailable; one entry per agent
pub fn fallback_highlights() -> Vec<Highlight> {
    vec![
        Highlight {
            agent: Agent::Teacher,
            timestamp: "01:30".to_string(),
            title: "Key Learning Concept".to_string(),
            description: "This section contains important educational content that viewers \
should focus on."
                .to_string(),
        },
        Highlight {
            agent: Agent::Analyst,
            timestamp: "03:45".to_string(),
            title: "Important Metric".to_string(),
            description: "A significant data point or statistic is presented here that supports \
the video's main argument."
                .to_string(),
        },
        Highlight {
            agent: Agent::Explorer,
            timestamp: "05:20".to_string(),
            title: "Next Steps".to_string(),
            description: "The video provides actionable advice or resources for viewers to \
explore further."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_HIGHLIGHTS: &str = r#"[
        {"agent": "The Teacher", "timestamp": "02:35", "title": "Core idea explained",
         "description": "The presenter walks through the core idea."},
        {"agent": "The Analyst", "timestamp": "07:10", "title": "Benchmark numbers",
         "description": "Throughput figures are compared across versions."}
    ]"#;

    #[test]
    fn strips_json_fences() {
        let fenced = format!("```json\n{VALID_HIGHLIGHTS}\n```");
        assert_eq!(strip_code_fences(&fenced), VALID_HIGHLIGHTS.trim());
    }

    #[test]
    fn strips_bare_fences() {
        let fenced = format!("```\n{VALID_HIGHLIGHTS}\n```");
        assert_eq!(strip_code_fences(&fenced), VALID_HIGHLIGHTS.trim());
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fences(VALID_HIGHLIGHTS), VALID_HIGHLIGHTS.trim());
    }

    #[test]
    fn parses_fenced_highlight_array() {
        let fenced = format!("```json\n{VALID_HIGHLIGHTS}\n```");
        let highlights = parse_highlights(&fenced).unwrap();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].agent, Agent::Teacher);
        assert_eq!(highlights[1].timestamp, "07:10");
    }

    #[test]
    fn garbage_output_does_not_parse() {
        assert!(parse_highlights("I could not find any highlights.").is_none());
        assert!(parse_highlights(r#"{"agent": "The Teacher"}"#).is_none());
        assert!(parse_highlights(r#"[{"agent": "The Manager", "timestamp": "0:00", "title": "t", "description": "d"}]"#).is_none());
    }

    #[test]
    fn endpoint_carries_model_and_key() {
        let generator = GeminiGenerator::new(
            reqwest::Client::new(),
            "sk-test".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        let url = generator.endpoint();
        assert!(url.contains("/models/gemini-2.5-flash:generateContent"));
        assert!(url.ends_with("?key=sk-test"));
    }

    #[test]
    fn fallback_covers_every_agent() {
        let highlights = fallback_highlights();
        assert_eq!(highlights.len(), 3);
        for agent in Agent::ALL {
            assert!(highlights.iter().any(|h| h.agent == agent));
        }
    }

    #[test]
    fn prompt_clamps_long_transcripts() {
        let transcript = "word ".repeat(10_000);
        let prompt = build_prompt(&transcript, "Long Video");
        assert!(prompt.len() < transcript.len());
        assert!(prompt.contains("Video Title: Long Video"));
    }
}
