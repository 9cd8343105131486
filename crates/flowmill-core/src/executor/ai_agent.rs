//! AI agent executor.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, warn};

use flowmill_types::agent::AgentRunStats;
use flowmill_types::llm::{ChatMessage, CompletionRequest, LlmError};
use flowmill_types::workflow::{NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;
use crate::engine::template::interpolate;
use crate::llm::pricing::{estimate_cost, format_cost};
use crate::llm::router::LlmRouter;
use crate::repository::agent::AgentRepository;

/// Invokes a configured agent through its LLM provider.
///
/// The prompt combines the agent's standing task with the node's
/// interpolated input (falling back to the trigger input). Usage and
/// estimated cost are recorded against the agent; accounting failures
/// are logged but do not fail the node.
pub struct AiAgentExecutor<A> {
    agents: Arc<A>,
    router: Arc<LlmRouter>,
}

impl<A: AgentRepository> AiAgentExecutor<A> {
    pub fn new(agents: Arc<A>, router: Arc<LlmRouter>) -> Self {
        Self { agents, router }
    }
}

impl<A: AgentRepository + 'static> NodeExecutor for AiAgentExecutor<A> {
    fn node_type(&self) -> NodeType {
        NodeType::AiAgent
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "ai",
            description: "Invokes a stored agent against an LLM provider",
            inputs: &["input"],
            outputs: &["content", "model", "provider", "usage", "cost_usd"],
            config_keys: &["agent_id", "input", "temperature", "max_tokens", "timeout_secs"],
        }
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        let NodeConfig::AiAgent {
            agent_id,
            input,
            temperature,
            max_tokens,
            timeout_secs,
        } = &node.config
        else {
            return Err(config_mismatch(NodeType::AiAgent, node));
        };

        let agent = self
            .agents
            .get_agent(agent_id)
            .await
            .map_err(|e| ExecutorError::Failed(e.to_string()))?
            .ok_or_else(|| {
                ExecutorError::InvalidConfig(format!(
                    "node '{}': agent {agent_id} does not exist",
                    node.id
                ))
            })?;
        if !agent.active {
            return Err(ExecutorError::Failed(format!(
                "node '{}': agent '{}' is inactive",
                node.id, agent.name
            )));
        }

        let namespace = ctx.namespace().await;
        let user_input = match input {
            Some(template) => interpolate(template, &namespace),
            None => ctx.trigger_input.to_string(),
        };
        let content = match &agent.task {
            Some(task) => format!("{task}\n\n{user_input}"),
            None => user_input,
        };

        let request = CompletionRequest {
            model: agent.model.clone(),
            system: (!agent.system_prompt.is_empty()).then(|| agent.system_prompt.clone()),
            messages: vec![ChatMessage::user(content)],
            temperature: temperature.unwrap_or(agent.temperature),
            max_tokens: max_tokens.unwrap_or(agent.max_tokens),
        };

        let started = tokio::time::Instant::now();
        let response = tokio::time::timeout(
            Duration::from_secs(*timeout_secs),
            self.router.complete(agent.provider, &request),
        )
        .await
        .map_err(|_| ExecutorError::Llm(LlmError::Timeout(*timeout_secs)))??;
        let duration_ms = started.elapsed().as_millis() as u64;

        let cost_usd = estimate_cost(
            agent.provider,
            &response.model,
            response.usage.input_tokens,
            response.usage.output_tokens,
        );
        debug!(
            node_id = %node.id,
            agent = %agent.name,
            model = %response.model,
            tokens = response.usage.total(),
            cost = %format_cost(cost_usd),
            "agent invocation complete"
        );

        let stats = AgentRunStats {
            agent_id: agent.id,
            execution_id: ctx.execution_id,
            model: response.model.clone(),
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            cost_usd,
            duration_ms,
            at: Utc::now(),
        };
        if let Err(err) = self.agents.record_run(&stats).await {
            warn!(agent_id = %agent.id, error = %err, "failed to record agent usage");
        }

        Ok(json!({
            "content": response.content,
            "model": response.model,
            "provider": agent.provider,
            "usage": {
                "input_tokens": response.usage.input_tokens,
                "output_tokens": response.usage.output_tokens,
            },
            "cost_usd": cost_usd,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
