//! Provider routing by [`LlmProviderKind`].

use std::collections::HashMap;

use flowmill_types::agent::LlmProviderKind;
use flowmill_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::BoxLlmProvider;

/// Maps agent provider kinds to registered provider clients.
///
/// Built once at startup; the `ai_agent` executor routes each invocation
/// through the agent's configured provider.
#[derive(Default)]
pub struct LlmRouter {
    providers: HashMap<LlmProviderKind, BoxLlmProvider>,
}

impl LlmRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: LlmProviderKind, provider: BoxLlmProvider) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn get(&self, kind: LlmProviderKind) -> Option<&BoxLlmProvider> {
        self.providers.get(&kind)
    }

    /// Route a completion to the provider registered for `kind`.
    pub async fn complete(
        &self,
        kind: LlmProviderKind,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or_else(|| LlmError::Request(format!("no provider registered for '{kind}'")))?;
        provider.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::LlmProvider;
    use flowmill_types::llm::{ChatMessage, TokenUsage};

    struct Named(&'static str);

    impl LlmProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.0.to_string(),
                model: request.model.clone(),
                usage: TokenUsage::default(),
                stop_reason: None,
            })
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "m".to_string(),
            system: None,
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.0,
            max_tokens: 8,
        }
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let router = LlmRouter::new()
            .register(LlmProviderKind::Anthropic, BoxLlmProvider::new(Named("a")))
            .register(LlmProviderKind::OpenAi, BoxLlmProvider::new(Named("o")));

        let response = router
            .complete(LlmProviderKind::OpenAi, &request())
            .await
            .unwrap();
        assert_eq!(response.content, "o");
    }

    #[tokio::test]
    async fn test_unregistered_kind_errors() {
        let router = LlmRouter::new();
        let err = router
            .complete(LlmProviderKind::Google, &request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no provider registered"));
    }
}
