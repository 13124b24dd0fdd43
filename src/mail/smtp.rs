use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use crate::mail::{DeliveryReceipt, MailSender, NotificationMessage, TransportError};

/// SMTP relay transport (Gmail by default)
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Port 465 uses implicit TLS, anything else STARTTLS.
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, TransportError> {
        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| TransportError::Connection(e.to_string()))?;

        let transport = builder
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| TransportError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

fn classify(err: lettre::transport::smtp::Error) -> TransportError {
    if err.is_permanent() || err.is_transient() {
        TransportError::Rejected(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: NotificationMessage) -> Result<DeliveryReceipt, TransportError> {
        let from = parse_mailbox(&message.from)?;
        let message_id = format!("<{}@{}>", Uuid::new_v4(), from.email.domain());

        let email = Message::builder()
            .from(from)
            .reply_to(parse_mailbox(&message.reply_to)?)
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject)
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(message.text, message.html))
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let response = self.transport.send(email).await.map_err(classify)?;
        if !response.is_positive() {
            return Err(TransportError::Rejected(response.code().to_string()));
        }

        tracing::debug!(message_id = %message_id, code = %response.code(), "SMTP server accepted message");

        Ok(DeliveryReceipt {
            message_id: Some(message_id),
        })
    }

    async fn verify(&self) -> Result<(), TransportError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransportError::Connection(
                "SMTP server did not answer NOOP".to_string(),
            )),
            Err(e) => Err(classify(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mailbox() {
        let mailbox = parse_mailbox("Sobrio30 <noreply@sobrio30.it>").expect("mailbox");
        assert_eq!(mailbox.email.domain(), "sobrio30.it");
        assert_eq!(mailbox.name.as_deref(), Some("Sobrio30"));

        assert!(matches!(
            parse_mailbox("not an address"),
            Err(TransportError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_sender_fails_before_connecting() {
        let mailer = SmtpMailer::new("smtp.invalid", 587, "user", "pass").expect("builder");

        let result = mailer
            .send(NotificationMessage {
                from: "broken".to_string(),
                to: "rivenditori@sobrio30.it".to_string(),
                reply_to: "mario@example.it".to_string(),
                subject: "Test".to_string(),
                text: "text".to_string(),
                html: "<p>html</p>".to_string(),
            })
            .await;

        assert!(matches!(result, Err(TransportError::Address { .. })));
    }
}
