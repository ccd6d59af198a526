use serde::{Deserialize, Serialize};

use super::provider::ProviderId;
use crate::eval::PolicyDecision;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub query: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub cluster_context: Option<String>,
    #[serde(default)]
    pub model_preferences: Option<ModelPreferences>,
    /// Recent terminal lines, oldest first. Entries may hold several lines.
    #[serde(default)]
    pub recent_terminal_context: Vec<String>,
}

impl SuggestRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Caller's choice of LLM provider, overriding the configured priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreferences {
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Heuristic,
    Agentic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    pub query: String,
    pub suggested_command: String,
    pub source: SuggestionSource,
    /// 0..=100
    pub confidence: u8,
    pub rationale: String,
    pub assumptions: Vec<String>,
    pub warnings: Vec<String>,
    pub policy_decision: PolicyDecision,
    pub generated_at: String,
}

/// A candidate command before the final policy re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPlan {
    pub command: String,
    pub source: SuggestionSource,
    pub confidence: u8,
    pub rationale: String,
    pub assumptions: Vec<String>,
    pub warnings: Vec<String>,
}
