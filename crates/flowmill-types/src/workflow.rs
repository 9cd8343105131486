//! Workflow definition model for Flowmill.
//!
//! Defines the canonical intermediate representation for automation graphs:
//! typed nodes connected by conditional edges, plus the workflow-level
//! execution configuration (timeout, retry policy, error handling). YAML
//! files and the JSON API both convert to and from `WorkflowDefinition`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition (canonical IR)
// ---------------------------------------------------------------------------

/// The canonical workflow definition.
///
/// A directed graph of typed [`WorkflowNode`]s connected by
/// [`WorkflowEdge`]s. The graph must be acyclic and contain at least one
/// trigger node; both constraints are checked by the validator in
/// flowmill-core, not enforced structurally here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// UUIDv7 assigned on first save.
    pub id: Uuid,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the workflow may be executed. Inactive definitions are
    /// rejected at start time.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Initial workflow-scoped variables. Trigger input is merged on top
    /// of these when an execution starts.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Graph nodes. Node ids must be unique within a workflow.
    pub nodes: Vec<WorkflowNode>,
    /// Directed edges between nodes, optionally guarded by a condition
    /// expression.
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    /// Workflow-level execution configuration.
    #[serde(default)]
    pub config: WorkflowConfig,
    /// Extensible metadata (dashboard tags, import provenance, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

fn default_active() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// The kind of node in a workflow graph. Selects the executor at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Trigger,
    Action,
    Condition,
    Delay,
    Transform,
    ApiCall,
    Webhook,
    Email,
    AiAgent,
}

impl NodeType {
    /// Wire name of the node type (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::Action => "action",
            NodeType::Condition => "condition",
            NodeType::Delay => "delay",
            NodeType::Transform => "transform",
            NodeType::ApiCall => "api_call",
            NodeType::Webhook => "webhook",
            NodeType::Email => "email",
            NodeType::AiAgent => "ai_agent",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// User-defined node id (e.g. "fetch-orders"). Unique within a workflow.
    pub id: String,
    /// Human-readable node name.
    pub name: String,
    /// The kind of node. Must agree with the `config` variant; the
    /// definition validator rejects mismatches at load time.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Typed per-node configuration, validated once at definition load.
    pub config: NodeConfig,
    /// Canvas position for the visual builder. Ignored by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
    /// Upstream node ids (informational; edges are authoritative).
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Downstream node ids (informational; edges are authoritative).
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// Canvas position coordinates for the visual builder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Node configuration (tagged union, one variant per node kind)
// ---------------------------------------------------------------------------

/// Typed node configuration payload.
///
/// Internally tagged by `type` to match the node wire format:
/// ```yaml
/// config:
///   type: delay
///   duration: 5
///   unit: seconds
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    /// Graph entry point. Passes the trigger input through unchanged.
    Trigger {},
    /// Built-in side-effect-free operation (log, set_variable, calculate,
    /// format_string).
    Action {
        #[serde(flatten)]
        op: ActionOp,
    },
    /// Evaluates a condition list and yields `{ "conditionMet": bool }`.
    Condition {
        #[serde(default)]
        conditions: Vec<ConditionTerm>,
        /// Result when the condition list is empty. Defaults to `false`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_path: Option<bool>,
    },
    /// Sleeps for `duration` in `unit`. Capped at 24 hours.
    Delay { duration: u64, unit: DelayUnit },
    /// Transforms an array/object selected from the execution context.
    Transform {
        /// Expression selecting the input value (e.g. `nodes.fetch.items`).
        input: String,
        #[serde(flatten)]
        operation: TransformOp,
    },
    /// Outbound HTTP request with local retry/backoff.
    ApiCall {
        method: String,
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<HttpAuth>,
        /// Per-request timeout in seconds (default 30).
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
        /// Additional attempts after the first failure (default 0).
        #[serde(default)]
        retries: u32,
    },
    /// Outbound webhook delivery with optional HMAC-SHA256 payload signing.
    Webhook {
        url: String,
        #[serde(default = "default_webhook_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        /// Shared secret for `X-Signature-256` payload signing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<HttpAuth>,
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },
    /// Sends an email through the mail collaborator.
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        to: Vec<String>,
        #[serde(default)]
        cc: Vec<String>,
        #[serde(default)]
        bcc: Vec<String>,
        subject: String,
        body: String,
    },
    /// Invokes a configured AI agent through its LLM provider.
    AiAgent {
        agent_id: Uuid,
        /// Template for the user-facing portion of the prompt. When absent
        /// the trigger input is used.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_tokens: Option<u32>,
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },
}

impl NodeConfig {
    /// The node type this config variant belongs to.
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeConfig::Trigger {} => NodeType::Trigger,
            NodeConfig::Action { .. } => NodeType::Action,
            NodeConfig::Condition { .. } => NodeType::Condition,
            NodeConfig::Delay { .. } => NodeType::Delay,
            NodeConfig::Transform { .. } => NodeType::Transform,
            NodeConfig::ApiCall { .. } => NodeType::ApiCall,
            NodeConfig::Webhook { .. } => NodeType::Webhook,
            NodeConfig::Email { .. } => NodeType::Email,
            NodeConfig::AiAgent { .. } => NodeType::AiAgent,
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

/// Operation performed by an Action node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionOp {
    /// Emit a log entry into the execution log.
    Log {
        message: String,
        #[serde(default)]
        level: LogLevel,
    },
    /// Write a variable into the execution context.
    SetVariable { name: String, value: Value },
    /// Evaluate an arithmetic/comparison expression over the variable
    /// namespace.
    Calculate {
        expression: String,
        /// Variable to store the result under, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    /// Interpolate a template string.
    FormatString {
        template: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

/// Severity level for Action log entries and execution log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Time unit for Delay nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DelayUnit {
    /// Convert a duration in this unit to milliseconds, saturating on
    /// overflow so absurd definitions cannot wrap.
    pub fn to_millis(&self, duration: u64) -> u64 {
        let per_unit = match self {
            DelayUnit::Seconds => 1_000,
            DelayUnit::Minutes => 60_000,
            DelayUnit::Hours => 3_600_000,
            DelayUnit::Days => 86_400_000,
        };
        duration.saturating_mul(per_unit)
    }
}

/// Operation performed by a Transform node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TransformOp {
    /// Map each array item through an expression or template. The item is
    /// bound as `item` (with `index`) in the per-item context.
    Map {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    /// Keep array items for which the expression is truthy.
    Filter { expression: String },
    /// Fold an array into a single value. `acc` and `item` are bound in
    /// the per-item context.
    Reduce {
        expression: String,
        #[serde(default)]
        initial: Value,
    },
    /// Sort an array, optionally by a dot-path key.
    Sort {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default)]
        descending: bool,
    },
    /// Render the input through a template string.
    Format { template: String },
    /// Extract a dot-path from the input.
    Extract { path: String },
    /// Merge the input with another value.
    Merge {
        strategy: MergeStrategy,
        with: Value,
    },
}

/// Strategy for the Transform `merge` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Shallow object merge; keys from `with` win.
    Merge,
    /// Array concatenation. Errors on non-array operands.
    Concat,
    /// Recursive object merge; arrays and scalars are replaced at the leaf.
    Deep,
}

/// Authentication configuration for outbound HTTP nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HttpAuth {
    /// `Authorization: Bearer <token>`.
    Bearer { token: String },
    /// `Authorization: Basic <base64(user:pass)>`.
    Basic { username: String, password: String },
    /// Arbitrary header-carried API key.
    ApiKey { header: String, key: String },
}

// ---------------------------------------------------------------------------
// Condition DSL
// ---------------------------------------------------------------------------

/// One term of the condition DSL used by Condition nodes.
///
/// Terms are combined left-to-right: `logic` on term *i* determines how
/// term *i+1* joins the running result. The first term seeds the
/// accumulator unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionTerm {
    /// Dot-notation path into the variable namespace.
    pub field: String,
    pub operator: ConditionOperator,
    /// Comparison operand. Unused by `is_empty`/`is_not_empty`.
    #[serde(default)]
    pub value: Value,
    /// How the *next* term combines with the running result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<LogicOp>,
}

/// Comparison operator of a condition term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    In,
    NotIn,
    Regex,
}

/// Boolean connective between adjacent condition terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOp {
    And,
    Or,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// A directed connection between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Optional guard expression evaluated against the execution context.
    /// An edge without a condition is unconditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

// ---------------------------------------------------------------------------
// Workflow-level configuration
// ---------------------------------------------------------------------------

/// Execution configuration applied to the whole workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Wall-clock budget for one execution, checked at node boundaries.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Orchestrator-level retry policy, consulted when `error_handling`
    /// is `retry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
    /// What the orchestrator does when a node fails.
    #[serde(default)]
    pub error_handling: ErrorHandling,
    /// Execute successors concurrently even for single-successor nodes.
    #[serde(default)]
    pub parallel: bool,
    /// Cap on concurrent branches within one execution (default 8).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_branch_concurrency: Option<usize>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_policy: None,
            error_handling: ErrorHandling::default(),
            parallel: false,
            max_branch_concurrency: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    300_000 // 5 minutes
}

/// Orchestrator behavior when a node executor fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Fail the execution on the first node failure.
    #[default]
    Stop,
    /// Record the failure, skip the failed node's descendants, and let
    /// sibling branches finish.
    Continue,
    /// Re-invoke the failed node per `retry_policy`, then stop on
    /// exhaustion.
    Retry,
}

/// Retry policy for the workflow-level `retry` error handling mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_delay_ms() -> u64 {
    1_000
}

/// Shape of the delay sequence between retry attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Same delay every attempt.
    Fixed,
    /// Delay grows linearly with the attempt number.
    Linear,
    /// Delay doubles every attempt.
    #[default]
    Exponential,
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based).
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        match self.backoff {
            BackoffKind::Fixed => self.backoff_delay_ms,
            BackoffKind::Linear => self.backoff_delay_ms.saturating_mul(attempt as u64),
            BackoffKind::Exponential => self
                .backoff_delay_ms
                .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(20)),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation report
// ---------------------------------------------------------------------------

/// Result of validating a workflow definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Fatal problems; execution must not start while any are present.
    pub errors: Vec<String>,
    /// Non-fatal observations (e.g. unreachable nodes).
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// A report with no findings.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trigger_node(id: &str) -> WorkflowNode {
        WorkflowNode {
            id: id.to_string(),
            name: id.to_string(),
            node_type: NodeType::Trigger,
            config: NodeConfig::Trigger {},
            position: None,
            inputs: vec![],
            outputs: vec![],
        }
    }

    fn sample_workflow() -> WorkflowDefinition {
        WorkflowDefinition {
            id: Uuid::now_v7(),
            name: "order-alerts".to_string(),
            description: Some("Notify on large orders".to_string()),
            active: true,
            variables: HashMap::from([("threshold".to_string(), json!(100))]),
            nodes: vec![
                trigger_node("start"),
                WorkflowNode {
                    id: "check".to_string(),
                    name: "Check Amount".to_string(),
                    node_type: NodeType::Condition,
                    config: NodeConfig::Condition {
                        conditions: vec![ConditionTerm {
                            field: "amount".to_string(),
                            operator: ConditionOperator::GreaterThan,
                            value: json!(100),
                            logic: None,
                        }],
                        default_path: None,
                    },
                    position: Some(NodePosition { x: 200.0, y: 50.0 }),
                    inputs: vec!["start".to_string()],
                    outputs: vec!["notify".to_string()],
                },
                WorkflowNode {
                    id: "notify".to_string(),
                    name: "Notify".to_string(),
                    node_type: NodeType::Webhook,
                    config: NodeConfig::Webhook {
                        url: "https://hooks.example.com/orders".to_string(),
                        method: "POST".to_string(),
                        headers: HashMap::new(),
                        payload: Some(json!({ "amount": "{{ amount }}" })),
                        secret: Some("shh".to_string()),
                        auth: None,
                        timeout_secs: 30,
                    },
                    position: None,
                    inputs: vec!["check".to_string()],
                    outputs: vec![],
                },
            ],
            edges: vec![
                WorkflowEdge {
                    id: "e1".to_string(),
                    source: "start".to_string(),
                    target: "check".to_string(),
                    condition: None,
                },
                WorkflowEdge {
                    id: "e2".to_string(),
                    source: "check".to_string(),
                    target: "notify".to_string(),
                    condition: Some("conditionMet".to_string()),
                },
            ],
            config: WorkflowConfig::default(),
            metadata: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Roundtrips
    // -----------------------------------------------------------------------

    #[test]
    fn test_definition_json_roundtrip() {
        let original = sample_workflow();
        let json_str = serde_json::to_string_pretty(&original).expect("serialize");
        let parsed: WorkflowDefinition = serde_json::from_str(&json_str).expect("deserialize");
        assert_eq!(parsed.name, original.name);
        assert_eq!(parsed.nodes.len(), 3);
        assert_eq!(parsed.edges.len(), 2);
        assert_eq!(parsed.edges[1].condition.as_deref(), Some("conditionMet"));
    }

    #[test]
    fn test_definition_yaml_roundtrip() {
        let original = sample_workflow();
        let yaml = serde_yaml_ng::to_string(&original).expect("serialize");
        assert!(yaml.contains("order-alerts"));
        assert!(yaml.contains("type: condition"));
        assert!(yaml.contains("type: webhook"));
        let parsed: WorkflowDefinition = serde_yaml_ng::from_str(&yaml).expect("deserialize");
        assert_eq!(parsed.nodes.len(), 3);
        assert!(parsed.active);
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = r#"
id: "01938e90-0000-7000-8000-000000000001"
name: minimal
nodes:
  - id: start
    name: Start
    type: trigger
    config:
      type: trigger
"#;
        let wf: WorkflowDefinition = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(wf.active);
        assert_eq!(wf.config.timeout_ms, 300_000);
        assert_eq!(wf.config.error_handling, ErrorHandling::Stop);
        assert!(!wf.config.parallel);
        assert!(wf.edges.is_empty());
    }

    // -----------------------------------------------------------------------
    // NodeConfig tagging
    // -----------------------------------------------------------------------

    #[test]
    fn test_node_config_action_tagging() {
        let config = NodeConfig::Action {
            op: ActionOp::SetVariable {
                name: "result".to_string(),
                value: json!("pass"),
            },
        };
        let json_str = serde_json::to_string(&config).unwrap();
        assert!(json_str.contains("\"type\":\"action\""));
        assert!(json_str.contains("\"action\":\"set_variable\""));
        let parsed: NodeConfig = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.node_type(), NodeType::Action);
    }

    #[test]
    fn test_node_config_delay_tagging() {
        let config: NodeConfig =
            serde_json::from_value(json!({ "type": "delay", "duration": 5, "unit": "minutes" }))
                .unwrap();
        match config {
            NodeConfig::Delay { duration, unit } => {
                assert_eq!(duration, 5);
                assert_eq!(unit, DelayUnit::Minutes);
            }
            other => panic!("expected delay config, got {other:?}"),
        }
    }

    #[test]
    fn test_node_config_api_call_defaults() {
        let config: NodeConfig = serde_json::from_value(json!({
            "type": "api_call",
            "method": "GET",
            "url": "https://api.example.com/things"
        }))
        .unwrap();
        match config {
            NodeConfig::ApiCall {
                timeout_secs,
                retries,
                auth,
                ..
            } => {
                assert_eq!(timeout_secs, 30);
                assert_eq!(retries, 0);
                assert!(auth.is_none());
            }
            other => panic!("expected api_call config, got {other:?}"),
        }
    }

    #[test]
    fn test_node_config_transform_tagging() {
        let config: NodeConfig = serde_json::from_value(json!({
            "type": "transform",
            "input": "nodes.fetch",
            "operation": "merge",
            "strategy": "deep",
            "with": { "a": { "y": 2 } }
        }))
        .unwrap();
        match config {
            NodeConfig::Transform { input, operation } => {
                assert_eq!(input, "nodes.fetch");
                assert!(matches!(
                    operation,
                    TransformOp::Merge {
                        strategy: MergeStrategy::Deep,
                        ..
                    }
                ));
            }
            other => panic!("expected transform config, got {other:?}"),
        }
    }

    #[test]
    fn test_http_auth_variants() {
        let auth: HttpAuth =
            serde_json::from_value(json!({ "type": "basic", "username": "u", "password": "p" }))
                .unwrap();
        assert!(matches!(auth, HttpAuth::Basic { .. }));

        let auth: HttpAuth =
            serde_json::from_value(json!({ "type": "api_key", "header": "X-Api-Key", "key": "k" }))
                .unwrap();
        assert!(matches!(auth, HttpAuth::ApiKey { .. }));
    }

    // -----------------------------------------------------------------------
    // Condition DSL serde
    // -----------------------------------------------------------------------

    #[test]
    fn test_condition_term_serde() {
        let term: ConditionTerm = serde_json::from_value(json!({
            "field": "order.total",
            "operator": "greater_than_or_equal",
            "value": 100,
            "logic": "AND"
        }))
        .unwrap();
        assert_eq!(term.operator, ConditionOperator::GreaterThanOrEqual);
        assert_eq!(term.logic, Some(LogicOp::And));
    }

    #[test]
    fn test_condition_term_value_defaults_null() {
        let term: ConditionTerm =
            serde_json::from_value(json!({ "field": "name", "operator": "is_empty" })).unwrap();
        assert!(term.value.is_null());
        assert!(term.logic.is_none());
    }

    // -----------------------------------------------------------------------
    // Delay units and retry backoff
    // -----------------------------------------------------------------------

    #[test]
    fn test_delay_unit_to_millis() {
        assert_eq!(DelayUnit::Seconds.to_millis(2), 2_000);
        assert_eq!(DelayUnit::Minutes.to_millis(3), 180_000);
        assert_eq!(DelayUnit::Hours.to_millis(1), 3_600_000);
        assert_eq!(DelayUnit::Days.to_millis(1), 86_400_000);
    }

    #[test]
    fn test_delay_unit_saturates_instead_of_wrapping() {
        assert_eq!(DelayUnit::Days.to_millis(u64::MAX), u64::MAX);
        assert_eq!(DelayUnit::Seconds.to_millis(u64::MAX / 2), u64::MAX);
    }

    #[test]
    fn test_retry_policy_backoff_shapes() {
        let fixed = RetryPolicy {
            max_retries: 3,
            backoff: BackoffKind::Fixed,
            backoff_delay_ms: 500,
        };
        assert_eq!(fixed.delay_ms(1), 500);
        assert_eq!(fixed.delay_ms(3), 500);

        let linear = RetryPolicy {
            max_retries: 3,
            backoff: BackoffKind::Linear,
            backoff_delay_ms: 500,
        };
        assert_eq!(linear.delay_ms(1), 500);
        assert_eq!(linear.delay_ms(3), 1_500);

        let exponential = RetryPolicy {
            max_retries: 3,
            backoff: BackoffKind::Exponential,
            backoff_delay_ms: 500,
        };
        assert_eq!(exponential.delay_ms(1), 500);
        assert_eq!(exponential.delay_ms(2), 1_000);
        assert_eq!(exponential.delay_ms(4), 4_000);
    }

    #[test]
    fn test_node_type_wire_names() {
        assert_eq!(NodeType::ApiCall.as_str(), "api_call");
        assert_eq!(NodeType::AiAgent.as_str(), "ai_agent");
        let parsed: NodeType = serde_json::from_value(json!("api_call")).unwrap();
        assert_eq!(parsed, NodeType::ApiCall);
    }
}
