//! Outbound email types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fully-interpolated email, ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Sender address. When absent the mail collaborator's configured
    /// default sender is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivery receipt from the mail collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider-assigned message id, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub accepted_at: DateTime<Utc>,
}

/// Errors from mail delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),

    #[error("mail provider returned status {status}: {body}")]
    Api { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_message_roundtrip() {
        let msg = EmailMessage {
            from: None,
            to: vec!["ops@example.com".to_string()],
            cc: vec![],
            bcc: vec![],
            subject: "alert".to_string(),
            body: "disk at 91%".to_string(),
        };
        let json_str = serde_json::to_string(&msg).unwrap();
        let parsed: EmailMessage = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.to, msg.to);
        assert!(parsed.from.is_none());
    }
}
