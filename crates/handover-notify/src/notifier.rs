//! Renders notifications, hands them to the mail transport and records every
//! attempt in the email log.
//!
//! Delivery problems never propagate: a failed render or send is logged
//! and stored as a `failed` row, and the caller carries on.

use crate::error::Result;
use crate::mailer::{EmailAttachment, Mailer, OutgoingEmail};
use crate::templates::TemplateEngine;
use chrono::Utc;
use handover_common::EmailStatus;
use handover_db::{EmailLog, EmailLogRepository};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// One message to render and send to a set of recipients.
#[derive(Debug, Clone)]
pub struct Notification {
    pub template: &'static str,
    pub context: Value,
    pub unit_id: Option<Uuid>,
    pub attachments: Vec<EmailAttachment>,
}

impl Notification {
    pub fn new(template: &'static str, context: Value) -> Self {
        Self { template, context, unit_id: None, attachments: Vec::new() }
    }

    pub fn for_unit(mut self, unit_id: Uuid) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    pub fn attach(mut self, attachment: EmailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Outcome of a [`Notifier::notify`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: usize,
    pub failed: usize,
}

pub struct Notifier {
    templates: TemplateEngine,
    mailer: Arc<dyn Mailer>,
    logs: EmailLogRepository,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, logs: EmailLogRepository) -> Result<Self> {
        Ok(Self { templates: TemplateEngine::new()?, mailer, logs })
    }

    pub fn transport(&self) -> &str {
        self.mailer.transport()
    }

    /// Send `notification` to each distinct recipient.
    pub async fn notify(&self, recipients: &[String], notification: &Notification) -> Delivery {
        let mut seen = std::collections::HashSet::new();
        let recipients: Vec<String> = recipients
            .iter()
            .map(|r| r.trim().to_lowercase())
            .filter(|r| !r.is_empty() && seen.insert(r.clone()))
            .collect();

        let mut delivery = Delivery::default();
        if recipients.is_empty() {
            return delivery;
        }

        let rendered = match self.templates.render(notification.template, &notification.context) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(template = notification.template, error = %e, "Email template failed to render");
                for recipient in &recipients {
                    self.record(recipient, notification.template, notification, Some(e.to_string()))
                        .await;
                    delivery.failed += 1;
                }
                return delivery;
            }
        };

        for recipient in recipients {
            let email = OutgoingEmail {
                to: recipient,
                subject: rendered.subject.clone(),
                html: rendered.html.clone(),
                attachments: notification.attachments.clone(),
            };
            match self.mailer.send(&email).await {
                Ok(()) => {
                    delivery.sent += 1;
                    self.record(&email.to, &email.subject, notification, None).await;
                }
                Err(e) => {
                    delivery.failed += 1;
                    tracing::warn!(
                        to = %email.to,
                        template = notification.template,
                        error = %e,
                        "Email delivery failed"
                    );
                    self.record(&email.to, &email.subject, notification, Some(e.to_string()))
                        .await;
                }
            }
        }

        tracing::debug!(
            template = notification.template,
            sent = delivery.sent,
            failed = delivery.failed,
            "Notification dispatched"
        );
        delivery
    }

    async fn record(
        &self,
        recipient: &str,
        subject: &str,
        notification: &Notification,
        error: Option<String>,
    ) {
        let log = EmailLog {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            template: notification.template.to_string(),
            status: if error.is_some() { EmailStatus::Failed } else { EmailStatus::Sent },
            error,
            unit_id: notification.unit_id,
            created_at: Utc::now(),
        };
        if let Err(e) = self.logs.insert(&log).await {
            tracing::error!(recipient = %recipient, error = %e, "Failed to write email log");
        }
    }
}
