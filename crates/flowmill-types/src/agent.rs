//! AI agent definitions consumed by the `ai_agent` node kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which LLM backend an agent speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    Anthropic,
    OpenAi,
    Google,
}

impl std::fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LlmProviderKind::Anthropic => "anthropic",
            LlmProviderKind::OpenAi => "open_ai",
            LlmProviderKind::Google => "google",
        };
        f.write_str(s)
    }
}

/// A configured AI agent: a provider, a model, and a standing prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: Uuid,
    pub name: String,
    pub provider: LlmProviderKind,
    /// Provider-specific model id (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    /// System prompt prepended to every invocation.
    #[serde(default)]
    pub system_prompt: String,
    /// Standing task description combined with per-node input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Inactive agents are stored but refuse invocation.
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_active() -> bool {
    true
}

/// Usage and cost accounting for one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunStats {
    pub agent_id: Uuid,
    pub execution_id: Uuid,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Estimated cost in USD, derived from the static pricing table.
    pub cost_usd: f64,
    /// Wall-clock time of the provider round trip.
    pub duration_ms: u64,
    pub at: DateTime<Utc>,
}
