pub mod resend;
pub mod smtp;
pub mod template;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, TransportConfig};

pub use template::{render_notification, FieldRow, Routing};

/// Fully formatted notification ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// What a transport reports back for an accepted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid mail address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail server connection failed: {0}")]
    Connection(String),

    #[error("Mail server rejected message: {0}")]
    Rejected(String),

    #[error("Mail API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Outbound mail capability used by the submission handler
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn send(&self, message: NotificationMessage) -> Result<DeliveryReceipt, TransportError>;

    /// Preflight the transport before accepting traffic
    async fn verify(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Build the transport selected by `MAIL_TRANSPORT`
pub fn build_transport(config: &Config) -> Result<Arc<dyn MailSender>, TransportError> {
    let sender: Arc<dyn MailSender> = match &config.transport {
        TransportConfig::Smtp {
            host,
            port,
            username,
            password,
        } => Arc::new(smtp::SmtpMailer::new(host, *port, username, password)?),
        TransportConfig::Resend { api_key } => Arc::new(resend::ResendMailer::new(api_key)?),
    };

    Ok(sender)
}
