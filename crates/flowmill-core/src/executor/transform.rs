//! Transform executor: data reshaping over context values.

use serde_json::{Map, Value, json};

use flowmill_types::workflow::{MergeStrategy, NodeConfig, NodeType, TransformOp, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;
use crate::engine::expression::{FlowEvaluator, truthy};
use crate::engine::template::{interpolate, resolve_path};

/// Applies a [`TransformOp`] to a value selected from the execution
/// namespace by the node's `input` expression.
///
/// Unlike edge guards, expression failures here are real errors: a
/// transform that cannot evaluate has no meaningful output to publish.
pub struct TransformExecutor {
    evaluator: FlowEvaluator,
}

impl TransformExecutor {
    pub fn new() -> Self {
        Self {
            evaluator: FlowEvaluator::new(),
        }
    }

    /// Per-item evaluation context: the namespace plus `item`/`index`
    /// bindings.
    fn item_context(namespace: &Value, item: &Value, index: usize) -> Value {
        let mut ctx = namespace.clone();
        if let Value::Object(map) = &mut ctx {
            map.insert("item".to_string(), item.clone());
            map.insert("index".to_string(), json!(index));
        }
        ctx
    }

    fn require_array(value: Value, node_id: &str, op: &str) -> Result<Vec<Value>, ExecutorError> {
        match value {
            Value::Array(items) => Ok(items),
            other => Err(ExecutorError::Failed(format!(
                "node '{node_id}': {op} requires an array input, got {}",
                type_name(&other)
            ))),
        }
    }
}

impl Default for TransformExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeExecutor for TransformExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Transform
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "data",
            description: "Reshapes data with map, filter, reduce, sort, pick, and merge operations",
            inputs: &["input"],
            outputs: &["result"],
            config_keys: &[
                "input",
                "operation",
                "expression",
                "template",
                "initial",
                "key",
                "descending",
                "path",
                "strategy",
                "with",
            ],
        }
    }

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        let NodeConfig::Transform { operation, .. } = &node.config else {
            return Err(config_mismatch(NodeType::Transform, node));
        };
        if let TransformOp::Map {
            expression: None,
            template: None,
        } = operation
        {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': map needs an expression or a template",
                node.id
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        let NodeConfig::Transform { input, operation } = &node.config else {
            return Err(config_mismatch(NodeType::Transform, node));
        };

        let namespace = ctx.namespace().await;
        let selected = self.evaluator.evaluate(input, &namespace)?;

        match operation {
            TransformOp::Map {
                expression,
                template,
            } => {
                let items = Self::require_array(selected, &node.id, "map")?;
                let mut mapped = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_ctx = Self::item_context(&namespace, item, index);
                    let value = match (expression, template) {
                        (Some(expr), _) => self.evaluator.evaluate(expr, &item_ctx)?,
                        (None, Some(tpl)) => Value::String(interpolate(tpl, &item_ctx)),
                        (None, None) => {
                            return Err(ExecutorError::InvalidConfig(format!(
                                "node '{}': map needs an expression or a template",
                                node.id
                            )));
                        }
                    };
                    mapped.push(value);
                }
                Ok(Value::Array(mapped))
            }

            TransformOp::Filter { expression } => {
                let items = Self::require_array(selected, &node.id, "filter")?;
                let mut kept = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    let item_ctx = Self::item_context(&namespace, &item, index);
                    if truthy(&self.evaluator.evaluate(expression, &item_ctx)?) {
                        kept.push(item);
                    }
                }
                Ok(Value::Array(kept))
            }

            TransformOp::Reduce {
                expression,
                initial,
            } => {
                let items = Self::require_array(selected, &node.id, "reduce")?;
                let mut acc = initial.clone();
                for (index, item) in items.iter().enumerate() {
                    let mut item_ctx = Self::item_context(&namespace, item, index);
                    if let Value::Object(map) = &mut item_ctx {
                        map.insert("acc".to_string(), acc);
                    }
                    acc = self.evaluator.evaluate(expression, &item_ctx)?;
                }
                Ok(acc)
            }

            TransformOp::Sort { key, descending } => {
                let mut items = Self::require_array(selected, &node.id, "sort")?;
                items.sort_by(|a, b| {
                    let (a, b) = match key {
                        Some(path) => (
                            resolve_path(a, path).unwrap_or(&Value::Null),
                            resolve_path(b, path).unwrap_or(&Value::Null),
                        ),
                        None => (a, b),
                    };
                    let ordering = compare_values(a, b);
                    if *descending { ordering.reverse() } else { ordering }
                });
                Ok(Value::Array(items))
            }

            TransformOp::Format { template } => {
                let mut format_ctx = namespace.clone();
                if let Value::Object(map) = &mut format_ctx {
                    map.insert("input".to_string(), selected);
                }
                Ok(Value::String(interpolate(template, &format_ctx)))
            }

            TransformOp::Extract { path } => {
                Ok(resolve_path(&selected, path).cloned().unwrap_or(Value::Null))
            }

            TransformOp::Merge { strategy, with } => merge(selected, with, *strategy, &node.id),
        }
    }
}

fn merge(
    input: Value,
    with: &Value,
    strategy: MergeStrategy,
    node_id: &str,
) -> Result<Value, ExecutorError> {
    match strategy {
        MergeStrategy::Merge => match (input, with) {
            (Value::Object(mut base), Value::Object(overlay)) => {
                for (key, value) in overlay {
                    base.insert(key.clone(), value.clone());
                }
                Ok(Value::Object(base))
            }
            (input, _) => Err(ExecutorError::Failed(format!(
                "node '{node_id}': merge requires object operands, got {} and {}",
                type_name(&input),
                type_name(with)
            ))),
        },
        MergeStrategy::Concat => match (input, with) {
            (Value::Array(mut base), Value::Array(tail)) => {
                base.extend(tail.iter().cloned());
                Ok(Value::Array(base))
            }
            (input, _) => Err(ExecutorError::Failed(format!(
                "node '{node_id}': concat requires array operands, got {} and {}",
                type_name(&input),
                type_name(with)
            ))),
        },
        MergeStrategy::Deep => match (input, with) {
            (Value::Object(base), Value::Object(overlay)) => {
                Ok(Value::Object(deep_merge(base, overlay)))
            }
            (input, _) => Err(ExecutorError::Failed(format!(
                "node '{node_id}': deep merge requires object operands, got {} and {}",
                type_name(&input),
                type_name(with)
            ))),
        },
    }
}

/// Recursive object merge. Arrays and scalars are replaced at the leaf.
fn deep_merge(mut base: Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    for (key, value) in overlay {
        match (base.remove(key), value) {
            (Some(Value::Object(nested)), Value::Object(overlay_nested)) => {
                base.insert(key.clone(), Value::Object(deep_merge(nested, overlay_nested)));
            }
            (_, value) => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
    base
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
