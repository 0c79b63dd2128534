//! Outbound mail transport
//!
//! Email goes through an HTTP relay. Sending fails while credentials are
//! unconfigured; the failure surfaces as a tool error outcome rather than
//! aborting the request.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::ToolError;

/// Mail relay configuration
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    /// Relay endpoint
    pub relay_url: Option<String>,
    /// Relay API token
    pub api_token: Option<String>,
    /// From address
    pub from_address: Option<String>,
}

impl From<&retail_assist_config::MailConfig> for MailConfig {
    fn from(config: &retail_assist_config::MailConfig) -> Self {
        Self {
            relay_url: config.relay_url.clone(),
            api_token: config.api_token.clone(),
            from_address: config.from_address.clone(),
        }
    }
}

/// Mail transport surface consumed by the send_email tool
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send a message; returns a status string ("sent") on success
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, ToolError>;
}

/// HTTP relay transport
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| ToolError::Execution(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, ToolError> {
        let (relay_url, api_token) = match (&self.config.relay_url, &self.config.api_token) {
            (Some(url), Some(token)) => (url, token),
            _ => {
                return Err(ToolError::Execution(
                    "Missing mail relay URL or API token".to_string(),
                ))
            }
        };

        let from = self
            .config
            .from_address
            .as_deref()
            .unwrap_or("no-reply@retail-assist.example");

        let response = self
            .client
            .post(relay_url)
            .bearer_auth(api_token)
            .json(&json!({
                "from": from,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!(
                "Mail relay returned {}",
                status
            )));
        }

        tracing::info!(to = to, "email relayed");
        Ok("sent".to_string())
    }
}

/// Recorded outbound message
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport that records messages instead of sending them
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, ToolError> {
        self.sent.lock().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok("sent".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_mailer_fails_without_credentials() {
        let mailer = HttpMailer::new(MailConfig::default()).unwrap();
        let err = mailer.send("a@example.com", "Hi", "Body").await.unwrap_err();
        assert!(err.to_string().contains("Missing mail relay"));
    }

    #[tokio::test]
    async fn test_recording_mailer_captures_message() {
        let mailer = RecordingMailer::new();
        let status = mailer
            .send("a@example.com", "Pickup ready", "Your order is ready")
            .await
            .unwrap();

        assert_eq!(status, "sent");
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.com");
    }
}
