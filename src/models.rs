use serde::{Deserialize, Serialize};

// Request body shared by the sync and async analyze endpoints
#[derive(Deserialize, Clone, Debug)]
pub struct AnalyzeRequest {
    pub url: String,
}

// The three analytical roles highlights are attributed to
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Agent {
    #[serde(rename = "The Teacher")]
    Teacher,
    #[serde(rename = "The Analyst")]
    Analyst,
    #[serde(rename = "The Explorer")]
    Explorer,
}

impl Agent {
    pub const ALL: [Agent; 3] = [Agent::Teacher, Agent::Analyst, Agent::Explorer];

    pub fn name(&self) -> &'static str {
        match self {
            Agent::Teacher => "The Teacher",
            Agent::Analyst => "The Analyst",
            Agent::Explorer => "The Explorer",
        }
    }
}

// One generated highlight; timestamp is "MM:SS" within the video
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Highlight {
    pub agent: Agent,
    pub timestamp: String,
    pub title: String,
    pub description: String,
}

// What the metadata collaborator returns; duration is "MM:SS"
#[derive(Clone, PartialEq, Debug)]
pub struct VideoMetadata {
    pub title: String,
    pub duration: String,
    pub thumbnail_url: String,
}

// Final output of one analysis
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct AnalysisResult {
    pub title: String,
    pub duration: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
    pub highlights: Vec<Highlight>,
    pub status: String,
}

// Per-agent status block the mobile UI renders next to results
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct AgentStatus {
    pub name: &'static str,
    pub status: &'static str,
    pub progress: f64,
}

#[derive(Serialize, Debug)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub agents: Vec<AgentStatus>,
}

impl AnalyzeResponse {
    // Sync responses always carry a finished agent set
    pub fn completed(result: AnalysisResult) -> Self {
        let agents = Agent::ALL
            .iter()
            .map(|a| AgentStatus {
                name: a.name(),
                status: "Completed",
                progress: 1.0,
            })
            .collect();
        Self { result, agents }
    }
}
