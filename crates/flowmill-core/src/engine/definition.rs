//! Definition loading and full validation.
//!
//! Parsing goes through serde, so the typed `NodeConfig` variants reject
//! structurally bad configs up front. Full validation layers the graph
//! checks and each registered executor's static checks on top.

use flowmill_types::workflow::{ValidationReport, WorkflowDefinition};

use super::graph;
use crate::executor::ExecutorRegistry;

/// Errors from definition loading.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("failed to parse workflow definition: {0}")]
    Parse(String),

    #[error("workflow definition is invalid: {}", .0.errors.join("; "))]
    Invalid(ValidationReport),
}

/// Parse a workflow definition from YAML.
pub fn from_yaml(source: &str) -> Result<WorkflowDefinition, DefinitionError> {
    serde_yaml_ng::from_str(source).map_err(|e| DefinitionError::Parse(e.to_string()))
}

/// Parse a workflow definition from JSON.
pub fn from_json(source: &str) -> Result<WorkflowDefinition, DefinitionError> {
    serde_json::from_str(source).map_err(|e| DefinitionError::Parse(e.to_string()))
}

/// Validate a definition: graph structure plus per-node executor checks.
pub fn validate(
    definition: &WorkflowDefinition,
    registry: &ExecutorRegistry,
) -> ValidationReport {
    let mut report = graph::validate(definition);

    for node in &definition.nodes {
        if let Err(err) = registry.validate_node(node) {
            report.errors.push(err.to_string());
        }
    }

    report.is_valid = report.errors.is_empty();
    report
}

/// Parse and validate in one step, failing on any error.
pub fn load_yaml(
    source: &str,
    registry: &ExecutorRegistry,
) -> Result<WorkflowDefinition, DefinitionError> {
    let definition = from_yaml(source)?;
    let report = validate(&definition, registry);
    if !report.is_valid {
        return Err(DefinitionError::Invalid(report));
    }
    Ok(definition)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
