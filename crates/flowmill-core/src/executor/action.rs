//! Action executor: built-in side-effect-free operations.

use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use flowmill_types::workflow::{ActionOp, LogLevel, NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;
use crate::engine::expression::FlowEvaluator;
use crate::engine::template::interpolate;

/// Executes `log`, `set_variable`, `calculate`, and `format_string`
/// operations.
///
/// `calculate` expression failures propagate as errors rather than
/// degrading to null: a broken formula is a workflow bug the author needs
/// to see.
pub struct ActionExecutor {
    evaluator: FlowEvaluator,
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self {
            evaluator: FlowEvaluator::new(),
        }
    }
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeExecutor for ActionExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Action
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "logic",
            description: "Built-in log, set_variable, calculate, and format_string operations",
            inputs: &[],
            outputs: &["result"],
            config_keys: &[
                "action", "message", "level", "name", "value", "expression", "target", "template",
            ],
        }
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        let NodeConfig::Action { op } = &node.config else {
            return Err(config_mismatch(NodeType::Action, node));
        };

        let namespace = ctx.namespace().await;

        match op {
            ActionOp::Log { message, level } => {
                let rendered = interpolate(message, &namespace);
                match level {
                    LogLevel::Debug => debug!(node_id = %node.id, "{rendered}"),
                    LogLevel::Info => info!(node_id = %node.id, "{rendered}"),
                    LogLevel::Warn => warn!(node_id = %node.id, "{rendered}"),
                    LogLevel::Error => error!(node_id = %node.id, "{rendered}"),
                }
                Ok(json!({ "message": rendered, "level": level }))
            }

            ActionOp::SetVariable { name, value } => {
                // String values may carry templates.
                let resolved = match value {
                    Value::String(s) => Value::String(interpolate(s, &namespace)),
                    other => other.clone(),
                };
                ctx.set_variable(name.clone(), resolved.clone()).await;
                Ok(json!({ "name": name, "value": resolved }))
            }

            ActionOp::Calculate { expression, target } => {
                let result = self.evaluator.evaluate(expression, &namespace)?;
                if let Some(target) = target {
                    ctx.set_variable(target.clone(), result.clone()).await;
                }
                Ok(json!({ "result": result }))
            }

            ActionOp::FormatString { template, target } => {
                let rendered = interpolate(template, &namespace);
                if let Some(target) = target {
                    ctx.set_variable(target.clone(), Value::String(rendered.clone()))
                        .await;
                }
                Ok(json!({ "result": rendered }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn context(variables: HashMap<String, Value>) -> ExecutionContext {
        ExecutionContext::new(Uuid::now_v7(), Uuid::now_v7(), variables, Value::Null, 300_000)
    }

    fn action_node(op: ActionOp) -> WorkflowNode {
        WorkflowNode {
            id: "act".to_string(),
            name: "Act".to_string(),
            node_type: NodeType::Action,
            config: NodeConfig::Action { op },
            position: None,
            inputs: vec![],
            outputs: vec![],
        }
    }

    #[tokio::test]
    async fn test_set_variable_with_template() {
        let ctx = context(HashMap::from([("user".to_string(), json!("alice"))]));
        let node = action_node(ActionOp::SetVariable {
            name: "greeting".to_string(),
            value: json!("hi {{ user }}"),
        });

        ActionExecutor::new().execute(&node, &ctx).await.unwrap();
        assert_eq!(ctx.variable("greeting").await, Some(json!("hi alice")));
    }

    #[tokio::test]
    async fn test_set_variable_non_string_passthrough() {
        let ctx = context(HashMap::new());
        let node = action_node(ActionOp::SetVariable {
            name: "count".to_string(),
            value: json!(41),
        });

        let output = ActionExecutor::new().execute(&node, &ctx).await.unwrap();
        assert_eq!(output["value"], json!(41));
        assert_eq!(ctx.variable("count").await, Some(json!(41)));
    }

    #[tokio::test]
    async fn test_calculate_stores_target() {
        let ctx = context(HashMap::from([
            ("price".to_string(), json!(40.0)),
            ("qty".to_string(), json!(3.0)),
        ]));
        let node = action_node(ActionOp::Calculate {
            expression: "price * qty".to_string(),
            target: Some("total".to_string()),
        });

        let output = ActionExecutor::new().execute(&node, &ctx).await.unwrap();
        assert_eq!(output["result"], json!(120.0));
        assert_eq!(ctx.variable("total").await, Some(json!(120.0)));
    }

    #[tokio::test]
    async fn test_calculate_error_propagates() {
        let ctx = context(HashMap::new());
        let node = action_node(ActionOp::Calculate {
            expression: "1 +* 2".to_string(),
            target: None,
        });

        let err = ActionExecutor::new().execute(&node, &ctx).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Expression(_)));
    }

    #[tokio::test]
    async fn test_format_string() {
        let ctx = context(HashMap::from([("name".to_string(), json!("Bob"))]));
        let node = action_node(ActionOp::FormatString {
            template: "Dear {{ name }},".to_string(),
            target: Some("salutation".to_string()),
        });

        ActionExecutor::new().execute(&node, &ctx).await.unwrap();
        assert_eq!(
            ctx.variable("salutation").await,
            Some(json!("Dear Bob,"))
        );
    }

    #[tokio::test]
    async fn test_log_renders_message() {
        let ctx = context(HashMap::from([("n".to_string(), json!(3))]));
        let node = action_node(ActionOp::Log {
            message: "processed {{ n }} items".to_string(),
            level: LogLevel::Info,
        });

        let output = ActionExecutor::new().execute(&node, &ctx).await.unwrap();
        assert_eq!(output["message"], json!("processed 3 items"));
    }
}
