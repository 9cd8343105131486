//! Trigger executor: the graph entry point.

use serde_json::Value;

use flowmill_types::workflow::{NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor};
use crate::engine::context::ExecutionContext;

/// Passes the execution's trigger input through as the node output.
pub struct TriggerExecutor;

impl NodeExecutor for TriggerExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Trigger
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "flow",
            description: "Entry point that passes the trigger input through",
            inputs: &[],
            outputs: &[],
            config_keys: &[],
        }
    }

    async fn execute(
        &self,
        _node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        Ok(ctx.trigger_input.clone())
    }
}
