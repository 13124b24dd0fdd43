use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::mail::{DeliveryReceipt, MailSender, NotificationMessage, TransportError};

const RESEND_API_URL: &str = "https://api.resend.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct Payload {
    from: String,
    to: Vec<String>,
    reply_to: String,
    subject: String,
    text: String,
    html: String,
}

impl From<NotificationMessage> for Payload {
    fn from(message: NotificationMessage) -> Self {
        Self {
            from: message.from,
            to: vec![message.to],
            reply_to: message.reply_to,
            subject: message.subject,
            text: message.text,
            html: message.html,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl ResendMailer {
    pub fn new(api_key: &str) -> Result<Self, TransportError> {
        Self::with_base_url(api_key, RESEND_API_URL, REQUEST_TIMEOUT)
    }

    /// A request that gets no complete answer within `timeout` fails as a connection error
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MailSender for ResendMailer {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, message: NotificationMessage) -> Result<DeliveryReceipt, TransportError> {
        let res = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Payload::from(message))
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // a 2xx with an unexpected body still means the message was queued
        let message_id = res
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|body| body.id);

        Ok(DeliveryReceipt { message_id })
    }
}
