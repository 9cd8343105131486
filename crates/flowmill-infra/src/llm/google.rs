//! Google Gemini generateContent API client.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use flowmill_core::llm::LlmProvider;
use flowmill_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, TokenUsage,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini API
/// (`/v1beta/models/{model}:generateContent`).
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn to_wire(&self, request: &CompletionRequest) -> WireRequest {
        WireRequest {
            system_instruction: request.system.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart { text: text.clone() }],
            }),
            contents: request
                .messages
                .iter()
                .map(|m| WireContent {
                    // Gemini calls the assistant role "model".
                    role: Some(match m.role {
                        MessageRole::User => "user".to_string(),
                        MessageRole::Assistant => "model".to_string(),
                    }),
                    parts: vec![WirePart {
                        text: m.content.clone(),
                    }],
                })
                .collect(),
            generation_config: WireGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

impl LlmProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.to_wire(request))
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let candidate = wire
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("response contained no candidates".to_string()))?;

        let content = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        let usage = wire.usage_metadata.unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            usage: TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            },
            stop_reason: candidate.finish_reason,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize)]
struct WirePart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    candidates: Vec<WireCandidate>,
    usage_metadata: Option<WireUsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: WireContent,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct WireUsageMetadata {
    prompt_token_count: u64,
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmill_types::llm::ChatMessage;

    #[test]
    fn test_assistant_role_maps_to_model() {
        let provider = GoogleProvider::new(SecretString::from("test-key"));
        let request = CompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            system: Some("Be brief".to_string()),
            messages: vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello")],
            temperature: 0.5,
            max_tokens: 128,
        };
        let wire = provider.to_wire(&request);
        assert!(wire.system_instruction.is_some());
        assert_eq!(wire.contents[0].role.as_deref(), Some("user"));
        assert_eq!(wire.contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_response_parsing_without_usage() {
        let raw = r#"{
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "Hello"}]},
                    "finishReason": "STOP"
                }
            ]
        }"#;
        let wire: WireResponse = serde_json::from_str(raw).unwrap();
        assert!(wire.usage_metadata.is_none());
        assert_eq!(wire.candidates[0].content.parts[0].text, "Hello");
    }
}
