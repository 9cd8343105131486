//! Node executors.
//!
//! One executor per node kind. Executors receive the node definition and
//! the shared [`ExecutionContext`], and return their output value; the
//! orchestrator publishes outputs into the context so executors never
//! write other nodes' results.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use flowmill_types::llm::LlmError;
use flowmill_types::mail::MailError;
use flowmill_types::workflow::{NodeType, WorkflowNode};

use crate::engine::context::{ContextError, ExecutionContext};
use crate::engine::expression::ExpressionError;
use crate::outbound::http::HttpError;

pub mod action;
pub mod ai_agent;
pub mod api_call;
pub mod condition;
pub mod delay;
pub mod email;
pub mod registry;
pub mod transform;
pub mod trigger;
pub mod webhook;

pub use registry::ExecutorRegistry;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from node execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The node's configuration is unusable (bad values, missing fields
    /// that serde defaults could not cover).
    #[error("invalid node configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("node timed out after {0}s")]
    Timeout(u64),

    /// Remote endpoint answered with a non-success status after all local
    /// retries.
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("execution failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// NodeExecutor
// ---------------------------------------------------------------------------

/// Tooling-facing description of an executor: what it consumes and
/// produces, and which config keys it reads. Not consulted at runtime.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorMetadata {
    pub category: &'static str,
    pub description: &'static str,
    /// Namespace keys the executor reads, beyond its own config.
    pub inputs: &'static [&'static str],
    /// Keys present in the executor's output object.
    pub outputs: &'static [&'static str],
    pub config_keys: &'static [&'static str],
}

/// A pluggable executor for one node kind.
pub trait NodeExecutor: Send + Sync {
    /// The node kind this executor handles.
    fn node_type(&self) -> NodeType;

    /// Describe this executor for tooling.
    fn metadata(&self) -> ExecutorMetadata;

    /// Static checks beyond what the typed config already guarantees.
    /// Called by the definition validator for every node of this kind.
    fn validate(&self, _node: &WorkflowNode) -> Result<(), ExecutorError> {
        Ok(())
    }

    /// Run the node against the shared context and return its output.
    fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> impl Future<Output = Result<Value, ExecutorError>> + Send;
}

/// Object-safe version of [`NodeExecutor`] with boxed futures.
pub trait NodeExecutorDyn: Send + Sync {
    fn node_type(&self) -> NodeType;

    fn metadata(&self) -> ExecutorMetadata;

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError>;

    fn execute_boxed<'a>(
        &'a self,
        node: &'a WorkflowNode,
        ctx: &'a ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ExecutorError>> + Send + 'a>>;
}

impl<T: NodeExecutor> NodeExecutorDyn for T {
    fn node_type(&self) -> NodeType {
        NodeExecutor::node_type(self)
    }

    fn metadata(&self) -> ExecutorMetadata {
        NodeExecutor::metadata(self)
    }

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        NodeExecutor::validate(self, node)
    }

    fn execute_boxed<'a>(
        &'a self,
        node: &'a WorkflowNode,
        ctx: &'a ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ExecutorError>> + Send + 'a>> {
        Box::pin(self.execute(node, ctx))
    }
}

/// Type-erased node executor, the unit the registry stores.
pub struct BoxNodeExecutor {
    inner: Box<dyn NodeExecutorDyn + Send + Sync>,
}

impl BoxNodeExecutor {
    pub fn new<T: NodeExecutor + 'static>(executor: T) -> Self {
        Self {
            inner: Box::new(executor),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.inner.node_type()
    }

    pub fn metadata(&self) -> ExecutorMetadata {
        self.inner.metadata()
    }

    pub fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        self.inner.validate(node)
    }

    pub async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        self.inner.execute_boxed(node, ctx).await
    }
}

/// The config variant did not match the executor. Validation rejects this
/// at load time, so hitting it at runtime is a wiring bug worth a clear
/// message.
pub(crate) fn config_mismatch(expected: NodeType, node: &WorkflowNode) -> ExecutorError {
    ExecutorError::InvalidConfig(format!(
        "node '{}' routed to the {} executor but configured as '{}'",
        node.id,
        expected,
        node.config.node_type()
    ))
}
