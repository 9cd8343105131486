//! Span attribute name constants for workflow instrumentation.
//!
//! Used as field names in `tracing::span!` and `tracing::info_span!` so
//! executions, nodes, and LLM calls carry consistent attributes across
//! the codebase.
//!
//! Span naming convention: `"{operation} {subject}"` (e.g.,
//! `"execute order-sync"` or `"node http-fetch"`).

// --- Workflow attributes ---

/// The workflow definition id.
pub const FLOW_WORKFLOW_ID: &str = "flow.workflow.id";

/// The workflow display name.
pub const FLOW_WORKFLOW_NAME: &str = "flow.workflow.name";

/// The execution id for one run.
pub const FLOW_EXECUTION_ID: &str = "flow.execution.id";

// --- Node attributes ---

/// The node id within the workflow graph.
pub const FLOW_NODE_ID: &str = "flow.node.id";

/// The node type (e.g., "api_call", "condition").
pub const FLOW_NODE_TYPE: &str = "flow.node.type";

/// The 1-based attempt number for a node run.
pub const FLOW_NODE_ATTEMPT: &str = "flow.node.attempt";

// --- GenAI attributes (OTel GenAI semantic conventions) ---

/// The name of the GenAI provider (e.g., "anthropic").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// The model ID requested.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

// --- Operation name values ---

/// One whole workflow execution.
pub const OP_EXECUTE: &str = "execute";

/// One node attempt.
pub const OP_NODE: &str = "node";

/// An AI agent invocation from an `ai_agent` node.
pub const OP_INVOKE_AGENT: &str = "invoke_agent";
