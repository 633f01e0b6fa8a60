//! Mail transports.
//!
//! Transports:
//!   LogMailer        development; writes each message to the tracing output
//!   HttpMailer       JSON POST to a transactional-mail provider
//!   RecordingMailer  keeps messages in memory (tests, dry runs)

use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use base64::Engine;
use handover_config::MailConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

// ── Message ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type: "application/pdf".to_string(), bytes }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
    fn transport(&self) -> &str;
}

/// Build the transport named in `[mail]`.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.transport.as_str() {
        "log" => Ok(Arc::new(LogMailer::new(&config.from_address))),
        "http" => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| NotifyError::Unavailable("mail.endpoint is not set".to_string()))?;
            Ok(Arc::new(HttpMailer::new(
                endpoint,
                config
                    .api_key
                    .as_ref()
                    .map(|key| SecretString::from(key.expose_secret().to_string())),
                &config.from_address,
                &config.from_name,
            )))
        }
        other => Err(NotifyError::Unavailable(format!("unknown transport '{}'", other))),
    }
}

// ── 1. Log ────────────────────────────────────────────────────────────────────

pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "Email (log transport)"
        );
        tracing::debug!(body = %email.html, "Email body");
        Ok(())
    }

    fn transport(&self) -> &str {
        "log"
    }
}

// ── 2. HTTP provider ──────────────────────────────────────────────────────────

pub struct HttpMailer {
    endpoint: String,
    api_key: Option<SecretString>,
    from_address: String,
    from_name: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ProviderAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct ProviderAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ProviderMessage<'a> {
    from: ProviderAddress<'a>,
    to: Vec<ProviderAddress<'a>>,
    subject: &'a str,
    html: &'a str,
    attachments: Vec<ProviderAttachment<'a>>,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        from_address: &str,
        from_name: &str,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            from_address: from_address.to_string(),
            from_name: from_name.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let body = ProviderMessage {
            from: ProviderAddress { email: &self.from_address, name: Some(&self.from_name) },
            to: vec![ProviderAddress { email: &email.to, name: None }],
            subject: &email.subject,
            html: &email.html,
            attachments: email
                .attachments
                .iter()
                .map(|a| ProviderAttachment {
                    filename: &a.file_name,
                    content_type: &a.content_type,
                    content: base64::engine::general_purpose::STANDARD.encode(&a.bytes),
                })
                .collect(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Provider { status: status.as_u16(), message });
        }
        tracing::debug!(to = %email.to, status = status.as_u16(), "Email accepted by provider");
        Ok(())
    }

    fn transport(&self) -> &str {
        "http"
    }
}

// ── 3. Recording ──────────────────────────────────────────────────────────────

/// Keeps every message in memory. Recipients registered with
/// [`RecordingMailer::fail_for`] are rejected.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, recipient: &str) {
        self.failing.lock().await.insert(recipient.to_lowercase());
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, recipient: &str) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|e| e.to.eq_ignore_ascii_case(recipient))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.failing.lock().await.contains(&email.to.to_lowercase()) {
            return Err(NotifyError::Provider { status: 550, message: "mailbox unavailable".to_string() });
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }

    fn transport(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_recording_mailer_fails_on_request() {
        let mailer = RecordingMailer::new();
        mailer.fail_for("Bounce@example.com").await;

        assert!(mailer.send(&email("ok@example.com")).await.is_ok());
        assert!(mailer.send(&email("bounce@example.com")).await.is_err());
        assert_eq!(mailer.sent().await.len(), 1);
        assert_eq!(mailer.sent_to("OK@example.com").await.len(), 1);
    }

    #[test]
    fn test_transport_from_config() {
        let mut config = MailConfig::default();
        assert_eq!(from_config(&config).unwrap().transport(), "log");

        config.transport = "http".to_string();
        assert!(from_config(&config).is_err());

        config.endpoint = Some("https://mail.example.com/send".to_string());
        assert_eq!(from_config(&config).unwrap().transport(), "http");

        config.transport = "carrier-pigeon".to_string();
        assert!(from_config(&config).is_err());
    }
}
