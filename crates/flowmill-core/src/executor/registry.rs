//! Executor registry.

use std::collections::HashMap;
use std::sync::Arc;

use flowmill_types::workflow::{NodeType, WorkflowNode};

use super::action::ActionExecutor;
use super::ai_agent::AiAgentExecutor;
use super::api_call::ApiCallExecutor;
use super::condition::ConditionExecutor;
use super::delay::DelayExecutor;
use super::email::EmailExecutor;
use super::transform::TransformExecutor;
use super::trigger::TriggerExecutor;
use super::webhook::WebhookExecutor;
use super::{BoxNodeExecutor, ExecutorError};
use crate::llm::router::LlmRouter;
use crate::outbound::http::BoxHttpDispatcher;
use crate::outbound::mail::BoxMailSender;
use crate::repository::agent::AgentRepository;

/// Maps node types to executors. Built once at startup and shared by all
/// executions.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<NodeType, BoxNodeExecutor>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard executor set, wired to the given collaborators.
    pub fn standard<A: AgentRepository + 'static>(
        dispatcher: Arc<BoxHttpDispatcher>,
        mail: Arc<BoxMailSender>,
        agents: Arc<A>,
        router: Arc<LlmRouter>,
    ) -> Self {
        Self::new()
            .register(BoxNodeExecutor::new(TriggerExecutor))
            .register(BoxNodeExecutor::new(ActionExecutor::new()))
            .register(BoxNodeExecutor::new(ConditionExecutor))
            .register(BoxNodeExecutor::new(DelayExecutor))
            .register(BoxNodeExecutor::new(TransformExecutor::new()))
            .register(BoxNodeExecutor::new(ApiCallExecutor::new(dispatcher.clone())))
            .register(BoxNodeExecutor::new(WebhookExecutor::new(dispatcher)))
            .register(BoxNodeExecutor::new(EmailExecutor::new(mail)))
            .register(BoxNodeExecutor::new(AiAgentExecutor::new(agents, router)))
    }

    /// Register an executor under its declared node type, replacing any
    /// previous registration.
    pub fn register(mut self, executor: BoxNodeExecutor) -> Self {
        self.executors.insert(executor.node_type(), executor);
        self
    }

    pub fn get(&self, node_type: NodeType) -> Option<&BoxNodeExecutor> {
        self.executors.get(&node_type)
    }

    /// Run the registered executor's static validation for `node`.
    pub fn validate_node(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        let executor = self.executors.get(&node.node_type).ok_or_else(|| {
            ExecutorError::InvalidConfig(format!(
                "no executor registered for node type '{}'",
                node.node_type
            ))
        })?;
        executor.validate(node)
    }
}
