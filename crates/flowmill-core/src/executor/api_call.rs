//! API call executor: outbound HTTP with local retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use flowmill_types::workflow::{NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;
use crate::engine::template::{interpolate, interpolate_value};
use crate::outbound::http::{BoxHttpDispatcher, OutboundRequest};

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

/// Issues an HTTP request with exponential backoff on failure.
///
/// The URL, header values, and body strings are interpolated against the
/// execution namespace before dispatch. Transport errors and non-2xx
/// statuses both count as retryable failures; the delay before retry
/// `n` is `2^(n-1)` seconds.
pub struct ApiCallExecutor {
    dispatcher: Arc<BoxHttpDispatcher>,
}

impl ApiCallExecutor {
    pub fn new(dispatcher: Arc<BoxHttpDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl NodeExecutor for ApiCallExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::ApiCall
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "integration",
            description: "Makes an outbound HTTP request with authentication and retries",
            inputs: &[],
            outputs: &["status", "headers", "body", "attempts"],
            config_keys: &[
                "method",
                "url",
                "headers",
                "body",
                "auth",
                "timeout_secs",
                "retries",
            ],
        }
    }

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        let NodeConfig::ApiCall { method, url, .. } = &node.config else {
            return Err(config_mismatch(NodeType::ApiCall, node));
        };
        if !ALLOWED_METHODS.contains(&method.to_uppercase().as_str()) {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': unsupported HTTP method '{method}'",
                node.id
            )));
        }
        if url.is_empty() {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': url must not be empty",
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
        self.validate(node)?;
        let NodeConfig::ApiCall {
            method,
            url,
            headers,
            body,
            auth,
            timeout_secs,
            retries,
        } = &node.config
        else {
            return Err(config_mismatch(NodeType::ApiCall, node));
        };

        let namespace = ctx.namespace().await;
        let url = interpolate(url, &namespace);
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.clone(), interpolate(v, &namespace)))
            .collect();
        let body = body.as_ref().map(|b| interpolate_value(b, &namespace));

        let mut last_error: Option<ExecutorError> = None;

        for attempt in 0..=*retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(1_000 << (attempt - 1).min(10));
                debug!(node_id = %node.id, attempt, backoff_ms = backoff.as_millis() as u64, "retrying request");
                tokio::time::sleep(backoff).await;
            }

            let mut request = OutboundRequest::new(method.to_uppercase(), url.clone());
            request.headers = headers.clone();
            request.body = body.clone();
            request.timeout = Duration::from_secs(*timeout_secs);
            if let Some(auth) = auth {
                request = request.with_auth(auth);
            }

            match self.dispatcher.dispatch(request).await {
                Ok(response) if response.is_success() => {
                    return Ok(json!({
                        "status": response.status,
                        "headers": response.headers,
                        "body": response.body_json(),
                        "attempts": attempt + 1,
                    }));
                }
                Ok(response) => {
                    warn!(node_id = %node.id, status = response.status, attempt, "request failed");
                    last_error = Some(ExecutorError::UpstreamStatus {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(err) => {
                    warn!(node_id = %node.id, error = %err, attempt, "request transport error");
                    last_error = Some(err.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ExecutorError::Failed(format!("node '{}': request never attempted", node.id))
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
