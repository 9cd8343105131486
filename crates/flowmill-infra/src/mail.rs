//! HTTP-API-backed [`MailSender`].

use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use flowmill_core::outbound::mail::MailSender;
use flowmill_types::mail::{EmailMessage, MailError, SendReceipt};

/// Sends mail through a transactional mail HTTP API (Resend-style:
/// `POST {base_url}/emails` with a bearer key and a JSON body).
pub struct HttpApiMailSender {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    /// Sender used when the message carries no `from` address.
    default_from: String,
}

impl HttpApiMailSender {
    pub fn new(api_key: SecretString, base_url: impl Into<String>, default_from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: base_url.into(),
            default_from: default_from.into(),
        }
    }

    fn to_wire<'a>(&'a self, message: &'a EmailMessage) -> WireEmail<'a> {
        WireEmail {
            from: message.from.as_deref().unwrap_or(&self.default_from),
            to: &message.to,
            cc: &message.cc,
            bcc: &message.bcc,
            subject: &message.subject,
            text: &message.body,
        }
    }
}

impl MailSender for HttpApiMailSender {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        let url = format!("{}/emails", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.to_wire(message))
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let accepted: WireAccepted = response
            .json()
            .await
            .unwrap_or(WireAccepted { id: None });

        Ok(SendReceipt {
            message_id: accepted.id,
            accepted_at: Utc::now(),
        })
    }
}

#[derive(Serialize)]
struct WireEmail<'a> {
    from: &'a str,
    to: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    cc: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    bcc: &'a [String],
    subject: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct WireAccepted {
    id: Option<String>,
}
