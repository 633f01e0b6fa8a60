//! Every send attempt lands in the email log, whatever the outcome.

use handover_common::EmailStatus;
use handover_db::{Database, EmailLogRepository};
use handover_notify::{EmailAttachment, Notification, Notifier, RecordingMailer};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

async fn setup() -> (Arc<RecordingMailer>, Notifier, EmailLogRepository) {
    let db = Database::open_in_memory().await.unwrap();
    db.initialize().await.unwrap();
    let logs = EmailLogRepository::new(Arc::new(db));
    let mailer = Arc::new(RecordingMailer::new());
    let notifier = Notifier::new(mailer.clone(), logs.clone()).unwrap();
    (mailer, notifier, logs)
}

fn payment_update() -> Notification {
    Notification::new(
        "payment_status",
        json!({"unit_number": "A-101", "property_name": "Marina Heights", "status": "cleared"}),
    )
}

#[tokio::test]
async fn test_sends_once_per_distinct_recipient() {
    let (mailer, notifier, logs) = setup().await;
    let unit_id = Uuid::new_v4();
    let recipients = vec![
        "sam@example.com".to_string(),
        " SAM@example.com".to_string(),
        "kim@example.com".to_string(),
        "".to_string(),
    ];

    let delivery = notifier.notify(&recipients, &payment_update().for_unit(unit_id)).await;
    assert_eq!(delivery.sent, 2);
    assert_eq!(delivery.failed, 0);

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "Payment status for unit A-101: cleared");

    let rows = logs.list(Some(unit_id), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == EmailStatus::Sent && r.template == "payment_status"));
}

#[tokio::test]
async fn test_failed_delivery_is_logged_not_raised() {
    let (mailer, notifier, logs) = setup().await;
    mailer.fail_for("bounce@example.com").await;

    let delivery = notifier
        .notify(
            &["ok@example.com".to_string(), "bounce@example.com".to_string()],
            &payment_update(),
        )
        .await;
    assert_eq!(delivery, handover_notify::Delivery { sent: 1, failed: 1 });

    let rows = logs.list(None, 10).await.unwrap();
    let failed: Vec<_> = rows.iter().filter(|r| r.status == EmailStatus::Failed).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].recipient, "bounce@example.com");
    assert!(failed[0].error.as_deref().unwrap().contains("mailbox unavailable"));
}

#[tokio::test]
async fn test_unknown_template_records_failure() {
    let (mailer, notifier, logs) = setup().await;
    let delivery = notifier
        .notify(&["sam@example.com".to_string()], &Notification::new("no_such_template", json!({})))
        .await;
    assert_eq!(delivery.failed, 1);
    assert!(mailer.sent().await.is_empty());
    assert_eq!(logs.list(None, 10).await.unwrap()[0].status, EmailStatus::Failed);
}

#[tokio::test]
async fn test_attachments_are_forwarded() {
    let (mailer, notifier, _) = setup().await;
    let note = payment_update().attach(EmailAttachment::pdf("soa.pdf", b"%PDF-1.5".to_vec()));
    notifier.notify(&["sam@example.com".to_string()], &note).await;

    let sent = mailer.sent_to("sam@example.com").await;
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(sent[0].attachments[0].content_type, "application/pdf");
}
