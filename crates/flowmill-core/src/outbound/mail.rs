//! Outbound mail seam.

use std::future::Future;
use std::pin::Pin;

use flowmill_types::mail::{EmailMessage, MailError, SendReceipt};

/// Transport seam for outbound email.
pub trait MailSender: Send + Sync {
    fn send(
        &self,
        message: &EmailMessage,
    ) -> impl Future<Output = Result<SendReceipt, MailError>> + Send;
}

/// Object-safe version of [`MailSender`] with boxed futures.
pub trait MailSenderDyn: Send + Sync {
    fn send_boxed<'a>(
        &'a self,
        message: &'a EmailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<SendReceipt, MailError>> + Send + 'a>>;
}

impl<T: MailSender> MailSenderDyn for T {
    fn send_boxed<'a>(
        &'a self,
        message: &'a EmailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<SendReceipt, MailError>> + Send + 'a>> {
        Box::pin(self.send(message))
    }
}

/// Type-erased mail sender for runtime composition.
pub struct BoxMailSender {
    inner: Box<dyn MailSenderDyn + Send + Sync>,
}

impl BoxMailSender {
    pub fn new<T: MailSender + 'static>(sender: T) -> Self {
        Self {
            inner: Box::new(sender),
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        self.inner.send_boxed(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct Accepting;

    impl MailSender for Accepting {
        async fn send(&self, _message: &EmailMessage) -> Result<SendReceipt, MailError> {
            Ok(SendReceipt {
                message_id: Some("msg-1".to_string()),
                accepted_at: Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn test_box_sender_delegates() {
        let sender = BoxMailSender::new(Accepting);
        let message = EmailMessage {
            from: None,
            to: vec!["ops@example.com".to_string()],
            cc: vec![],
            bcc: vec![],
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        let receipt = sender.send(&message).await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("msg-1"));
    }
}
