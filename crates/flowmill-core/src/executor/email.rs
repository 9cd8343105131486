//! Email executor.

use std::sync::Arc;

use serde_json::{Value, json};

use flowmill_types::mail::{EmailMessage, MailError};
use flowmill_types::workflow::{NodeConfig, NodeType, WorkflowNode};

use super::{ExecutorError, ExecutorMetadata, NodeExecutor, config_mismatch};
use crate::engine::context::ExecutionContext;
use crate::engine::template::interpolate;
use crate::outbound::mail::BoxMailSender;

/// Interpolates the configured message and hands it to the mail
/// collaborator.
///
/// Address validation at definition time accepts either a plain address
/// containing `@` or a template placeholder that resolves at run time;
/// the resolved addresses are checked again before sending.
pub struct EmailExecutor {
    sender: Arc<BoxMailSender>,
}

impl EmailExecutor {
    pub fn new(sender: Arc<BoxMailSender>) -> Self {
        Self { sender }
    }
}

fn plausible_address(address: &str) -> bool {
    address.contains('@') || address.contains("{{")
}

impl NodeExecutor for EmailExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Email
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            category: "integration",
            description: "Sends an email through the configured mail sender",
            inputs: &[],
            outputs: &["message_id", "accepted_at", "recipients"],
            config_keys: &["from", "to", "cc", "bcc", "subject", "body"],
        }
    }

    fn validate(&self, node: &WorkflowNode) -> Result<(), ExecutorError> {
        let NodeConfig::Email { to, cc, bcc, .. } = &node.config else {
            return Err(config_mismatch(NodeType::Email, node));
        };
        if to.is_empty() {
            return Err(ExecutorError::InvalidConfig(format!(
                "node '{}': email needs at least one recipient",
                node.id
            )));
        }
        for address in to.iter().chain(cc).chain(bcc) {
            if !plausible_address(address) {
                return Err(ExecutorError::InvalidConfig(format!(
                    "node '{}': '{address}' is not a valid address or template",
                    node.id
                )));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &ExecutionContext,
    ) -> Result<Value, ExecutorError> {
        self.validate(node)?;
        let NodeConfig::Email {
            from,
            to,
            cc,
            bcc,
            subject,
            body,
        } = &node.config
        else {
            return Err(config_mismatch(NodeType::Email, node));
        };

        let namespace = ctx.namespace().await;
        let render_addresses = |addresses: &[String]| -> Result<Vec<String>, ExecutorError> {
            addresses
                .iter()
                .map(|a| {
                    let rendered = interpolate(a, &namespace);
                    if rendered.contains('@') {
                        Ok(rendered)
                    } else {
                        Err(ExecutorError::Mail(MailError::InvalidAddress(rendered)))
                    }
                })
                .collect()
        };

        let message = EmailMessage {
            from: from.as_ref().map(|f| interpolate(f, &namespace)),
            to: render_addresses(to)?,
            cc: render_addresses(cc)?,
            bcc: render_addresses(bcc)?,
            subject: interpolate(subject, &namespace),
            body: interpolate(body, &namespace),
        };

        let recipient_count = message.to.len() + message.cc.len() + message.bcc.len();
        let receipt = self.sender.send(&message).await?;

        Ok(json!({
            "message_id": receipt.message_id,
            "accepted_at": receipt.accepted_at,
            "recipients": recipient_count,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::mail::MailSender;
    use chrono::Utc;
    use flowmill_types::mail::SendReceipt;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct Outbox(Mutex<Vec<EmailMessage>>);

    impl MailSender for Outbox {
        async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
            self.0.lock().unwrap().push(message.clone());
            Ok(SendReceipt {
                message_id: Some("m-1".to_string()),
                accepted_at: Utc::now(),
            })
        }
    }

    fn email_node(to: Vec<&str>) -> WorkflowNode {
        WorkflowNode {
            id: "mail".to_string(),
            name: "Mail".to_string(),
            node_type: NodeType::Email,
            config: NodeConfig::Email {
                from: None,
                to: to.into_iter().map(String::from).collect(),
                cc: vec![],
                bcc: vec![],
                subject: "Order {{ order_id }}".to_string(),
                body: "Total: {{ total }}".to_string(),
            },
            position: None,
            inputs: vec![],
            outputs: vec![],
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            HashMap::from([
                ("order_id".to_string(), json!("42")),
                ("total".to_string(), json!(99.5)),
                ("customer_email".to_string(), json!("c@example.com")),
            ]),
            Value::Null,
            300_000,
        )
    }

    #[tokio::test]
    async fn test_renders_and_sends() {
        let outbox = Arc::new(Outbox(Mutex::new(Vec::new())));
        struct Shared(Arc<Outbox>);
        impl MailSender for Shared {
            async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
                self.0.send(message).await
            }
        }

        let executor = EmailExecutor::new(Arc::new(BoxMailSender::new(Shared(outbox.clone()))));
        let node = email_node(vec!["{{ customer_email }}"]);
        let output = executor.execute(&node, &context()).await.unwrap();
        assert_eq!(output["recipients"], json!(1));

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent[0].to, vec!["c@example.com"]);
        assert_eq!(sent[0].subject, "Order 42");
        assert_eq!(sent[0].body, "Total: 99.5");
    }

    #[tokio::test]
    async fn test_unresolved_template_address_fails() {
        let executor = EmailExecutor::new(Arc::new(BoxMailSender::new(Outbox(Mutex::new(vec![])))));
        let node = email_node(vec!["{{ missing_email }}"]);
        let err = executor.execute(&node, &context()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Mail(MailError::InvalidAddress(_))));
    }

    #[test]
    fn test_validate_rejects_bad_address() {
        let executor = EmailExecutor::new(Arc::new(BoxMailSender::new(Outbox(Mutex::new(vec![])))));
        let node = email_node(vec!["not-an-address"]);
        assert!(executor.validate(&node).is_err());
    }

    #[test]
    fn test_validate_requires_recipient() {
        let executor = EmailExecutor::new(Arc::new(BoxMailSender::new(Outbox(Mutex::new(vec![])))));
        let node = email_node(vec![]);
        assert!(executor.validate(&node).is_err());
    }
}
