//! Delay executor.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use flowmill_types::workflow::{NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;

/// Longest permitted delay: 24 hours.
const MAX_DELAY_MS: u64 = 86_400_000;

/// Sleeps for the configured duration and reports the actual elapsed time.
///
/// Delays are capped at 24 hours and measured with the tokio clock, so
/// paused-clock tests see exact timings.
pub struct DelayExecutor;

impl NodeExecutor for DelayExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Delay
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "flow",
            description: "Pauses the branch for a configured duration",
            inputs: &[],
            outputs: &["requested_delay_ms", "actual_delay_ms"],
            config_keys: &["duration", "unit"],
        }
    }

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        let NodeConfig::Delay { duration, unit } = &node.config else {
            return Err(config_mismatch(NodeType::Delay, node));
        };
        if *duration == 0 {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': delay duration must be positive",
                node.id
            )));
        }
        if unit.to_millis(*duration) > MAX_DELAY_MS {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': delay exceeds the 24 hour maximum",
                node.id
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        _ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        self.validate(node)?;
        let NodeConfig::Delay { duration, unit } = &node.config else {
            return Err(config_mismatch(NodeType::Delay, node));
        };

        let delay_ms = unit.to_millis(*duration);
        debug!(node_id = %node.id, delay_ms, "delaying");

        let start = tokio::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        let actual_delay_ms = start.elapsed().as_millis() as u64;

        Ok(json!({
            "requested_delay_ms": delay_ms,
            "actual_delay_ms": actual_delay_ms,
        }))
    }
}
