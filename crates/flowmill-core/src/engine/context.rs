//! Shared execution context for one workflow run.
//!
//! The context is created by the orchestrator, wrapped in an `Arc`, and
//! handed to every node executor. Mutable state lives behind a single
//! `RwLock`; executors write variables through [`set_variable`] and the
//! orchestrator records node outputs through the insert-once
//! [`set_node_output`], so a node's published output can never change
//! after downstream nodes have read it.
//!
//! [`set_variable`]: ExecutionContext::set_variable
//! [`set_node_output`]: ExecutionContext::set_node_output

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("output for node '{0}' was already recorded")]
    DuplicateNodeOutput(String),
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Caller-supplied scoping for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Free-form source label ("schedule", "webhook", "manual", ...).
    pub triggered_by: Option<String>,
}

/// Runtime state shared by all nodes of one execution.
pub struct ExecutionContext {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub triggered_by: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Wall-clock budget boundary, checked at node boundaries.
    pub deadline: Instant,
    /// The input the execution was started with. Trigger nodes pass this
    /// through as their output.
    pub trigger_input: Value,
    state: RwLock<ContextState>,
}

#[derive(Default)]
struct ContextState {
    variables: HashMap<String, Value>,
    node_outputs: HashMap<String, Value>,
    executed: HashSet<String>,
}

/// Point-in-time copy of the mutable context state.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub variables: HashMap<String, Value>,
    pub node_outputs: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Create a context for a run starting now.
    ///
    /// Object-shaped trigger input is merged into the initial variables
    /// (trigger keys win); any other shape is stored under the `input`
    /// variable. The raw value is kept as `trigger_input` either way.
    pub fn new(
        execution_id: Uuid,
        workflow_id: Uuid,
        initial_variables: HashMap<String, Value>,
        trigger_input: Value,
        timeout_ms: u64,
    ) -> Self {
        let mut variables = initial_variables;
        match &trigger_input {
            Value::Object(map) => {
                for (key, value) in map {
                    variables.insert(key.clone(), value.clone());
                }
            }
            Value::Null => {}
            other => {
                variables.insert("input".to_string(), other.clone());
            }
        }

        Self {
            execution_id,
            workflow_id,
            team_id: None,
            user_id: None,
            triggered_by: None,
            started_at: Utc::now(),
            deadline: Instant::now() + std::time::Duration::from_millis(timeout_ms),
            trigger_input,
            state: RwLock::new(ContextState {
                variables,
                node_outputs: HashMap::new(),
                executed: HashSet::new(),
            }),
        }
    }

    /// Attach caller-supplied scoping. Called before the context is
    /// shared.
    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        self.team_id = options.team_id;
        self.user_id = options.user_id;
        self.triggered_by = options.triggered_by;
        self
    }

    /// Whether the execution's wall-clock budget has elapsed.
    pub fn deadline_exceeded(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub async fn set_variable(&self, name: impl Into<String>, value: Value) {
        self.state.write().await.variables.insert(name.into(), value);
    }

    pub async fn variable(&self, name: &str) -> Option<Value> {
        self.state.read().await.variables.get(name).cloned()
    }

    /// Record a node's output. Outputs are insert-once.
    pub async fn set_node_output(&self, node_id: &str, output: Value) -> Result<(), ContextError> {
        let mut state = self.state.write().await;
        if state.node_outputs.contains_key(node_id) {
            return Err(ContextError::DuplicateNodeOutput(node_id.to_string()));
        }
        state.node_outputs.insert(node_id.to_string(), output);
        Ok(())
    }

    pub async fn node_output(&self, node_id: &str) -> Option<Value> {
        self.state.read().await.node_outputs.get(node_id).cloned()
    }

    /// Claim a node for execution. Returns `false` if the node was already
    /// claimed, which is how diamond joins avoid running twice.
    pub async fn claim_node(&self, node_id: &str) -> bool {
        self.state.write().await.executed.insert(node_id.to_string())
    }

    pub async fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.read().await;
        ContextSnapshot {
            variables: state.variables.clone(),
            node_outputs: state.node_outputs.clone(),
        }
    }

    /// Build the JSON namespace templates and conditions resolve against.
    ///
    /// Shape: variables at the top level, node outputs under both their
    /// node id and the reserved `nodes` key, the raw trigger input under
    /// `trigger`. Node ids win over variables on collision.
    pub async fn namespace(&self) -> Value {
        let state = self.state.read().await;
        let mut root = Map::new();
        for (name, value) in &state.variables {
            root.insert(name.clone(), value.clone());
        }

        let mut nodes = Map::new();
        for (id, output) in &state.node_outputs {
            root.insert(id.clone(), output.clone());
            nodes.insert(id.clone(), output.clone());
        }
        root.insert("nodes".to_string(), Value::Object(nodes));
        root.insert("trigger".to_string(), self.trigger_input.clone());

        Value::Object(root)
    }

    /// Namespace for evaluating an edge guard leaving `source_output`'s
    /// node. Object-shaped outputs are lifted to the top level so guards
    /// like `conditionMet` resolve without naming the node.
    pub async fn edge_namespace(&self, source_output: &Value) -> Value {
        let mut root = self.namespace().await;
        if let (Value::Object(map), Value::Object(fields)) = (&mut root, source_output) {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
        }
        root
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(trigger_input: Value) -> ExecutionContext {
        ExecutionContext::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            HashMap::from([("threshold".to_string(), json!(100))]),
            trigger_input,
            300_000,
        )
    }

    #[tokio::test]
    async fn test_object_trigger_input_merges_into_variables() {
        let ctx = context(json!({ "status": "ok", "threshold": 5 }));
        assert_eq!(ctx.variable("status").await, Some(json!("ok")));
        // Trigger keys win over initial variables.
        assert_eq!(ctx.variable("threshold").await, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_scalar_trigger_input_stored_under_input() {
        let ctx = context(json!("raw payload"));
        assert_eq!(ctx.variable("input").await, Some(json!("raw payload")));
        assert_eq!(ctx.variable("threshold").await, Some(json!(100)));
    }

    #[tokio::test]
    async fn test_node_output_insert_once() {
        let ctx = context(Value::Null);
        ctx.set_node_output("a", json!(1)).await.unwrap();
        let err = ctx.set_node_output("a", json!(2)).await.unwrap_err();
        assert!(matches!(err, ContextError::DuplicateNodeOutput(_)));
        assert_eq!(ctx.node_output("a").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_claim_node_once() {
        let ctx = context(Value::Null);
        assert!(ctx.claim_node("join").await);
        assert!(!ctx.claim_node("join").await);
    }

    #[tokio::test]
    async fn test_namespace_shape() {
        let ctx = context(json!({ "status": "ok" }));
        ctx.set_node_output("fetch", json!({ "items": [1, 2] }))
            .await
            .unwrap();

        let ns = ctx.namespace().await;
        assert_eq!(ns["status"], json!("ok"));
        assert_eq!(ns["fetch"]["items"], json!([1, 2]));
        assert_eq!(ns["nodes"]["fetch"]["items"], json!([1, 2]));
        assert_eq!(ns["trigger"]["status"], json!("ok"));
    }

    #[tokio::test]
    async fn test_edge_namespace_lifts_source_output_fields() {
        let ctx = context(Value::Null);
        let ns = ctx
            .edge_namespace(&json!({ "conditionMet": true }))
            .await;
        assert_eq!(ns["conditionMet"], json!(true));
    }

    #[tokio::test]
    async fn test_run_options_attached() {
        let team_id = Uuid::now_v7();
        let ctx = context(Value::Null).with_run_options(RunOptions {
            team_id: Some(team_id),
            user_id: None,
            triggered_by: Some("schedule".to_string()),
        });
        assert_eq!(ctx.team_id, Some(team_id));
        assert!(ctx.user_id.is_none());
        assert_eq!(ctx.triggered_by.as_deref(), Some("schedule"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let ctx = ExecutionContext::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            HashMap::new(),
            Value::Null,
            1_000,
        );
        assert!(!ctx.deadline_exceeded());
        tokio::time::advance(std::time::Duration::from_millis(1_001)).await;
        assert!(ctx.deadline_exceeded());
    }
}
