//! Condition executor.

use serde_json::{Value, json};

use flowmill_types::workflow::{NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::condition::evaluate_conditions;
use crate::engine::context::ExecutionContext;

/// Evaluates the node's condition list and yields
/// `{ "conditionMet": bool }`. Downstream edge guards branch on the
/// lifted `conditionMet` field.
pub struct ConditionExecutor;

impl NodeExecutor for ConditionExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Condition
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "logic",
            description: "Evaluates a condition list and reports whether it matched",
            inputs: &[],
            outputs: &["conditionMet"],
            config_keys: &["conditions", "default_path"],
        }
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        let NodeConfig::Condition {
            conditions,
            default_path,
        } = &node.config
        else {
            return Err(config_mismatch(NodeType::Condition, node));
        };

        let namespace = ctx.namespace().await;
        let met = evaluate_conditions(conditions, &namespace, default_path.unwrap_or(false));

        Ok(json!({ "conditionMet": met }))
    }
}
