//! Webhook executor: outbound delivery with optional payload signing.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use flowmill_types::workflow::{NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;
use crate::engine::template::{interpolate, interpolate_value};
use crate::outbound::http::{BoxHttpDispatcher, OutboundRequest, signature_header};

/// Delivers a JSON payload to a webhook endpoint.
///
/// When a secret is configured the serialized payload is signed with
/// HMAC-SHA256 and the signature is sent as `X-Signature-256`, so the
/// receiver can verify both origin and integrity. The payload defaults
/// to the full context snapshot when not configured.
pub struct WebhookExecutor {
    dispatcher: Arc<BoxHttpDispatcher>,
}

impl WebhookExecutor {
    pub fn new(dispatcher: Arc<BoxHttpDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl NodeExecutor for WebhookExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Webhook
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "integration",
            description: "Posts a payload to an external endpoint, optionally HMAC-signed",
            inputs: &[],
            outputs: &["status", "body", "signed"],
            config_keys: &[
                "url",
                "method",
                "headers",
                "payload",
                "secret",
                "auth",
                "timeout_secs",
            ],
        }
    }

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        let NodeConfig::Webhook { url, .. } = &node.config else {
            return Err(config_mismatch(NodeType::Webhook, node));
        };
        if url.is_empty() {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': webhook url must not be empty",
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
        let NodeConfig::Webhook {
            url,
            method,
            headers,
            payload,
            secret,
            auth,
            timeout_secs,
        } = &node.config
        else {
            return Err(config_mismatch(NodeType::Webhook, node));
        };

        let namespace = ctx.namespace().await;
        let url = interpolate(url, &namespace);

        let payload = match payload {
            Some(payload) => interpolate_value(payload, &namespace),
            None => {
                let snapshot = ctx.snapshot().await;
                json!({
                    "execution_id": ctx.execution_id,
                    "workflow_id": ctx.workflow_id,
                    "variables": snapshot.variables,
                })
            }
        };

        let mut request = OutboundRequest::new(method.to_uppercase(), url);
        request.headers = headers
            .iter()
            .map(|(k, v)| (k.clone(), interpolate(v, &namespace)))
            .collect();
        request.timeout = Duration::from_secs(*timeout_secs);

        let signed = if let Some(secret) = secret {
            let serialized =
                serde_json::to_vec(&payload).map_err(|e| ExecutorError::Failed(e.to_string()))?;
            request.headers.insert(
                "X-Signature-256".to_string(),
                signature_header(secret, &serialized),
            );
            true
        } else {
            false
        };
        request.body = Some(payload);

        if let Some(auth) = auth {
            request = request.with_auth(auth);
        }

        let response = self.dispatcher.dispatch(request).await?;
        if !response.is_success() {
            return Err(ExecutorError::UpstreamStatus {
                status: response.status,
                body: response.body,
            });
        }

        Ok(json!({
            "status": response.status,
            "body": response.body_json(),
            "signed": signed,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
