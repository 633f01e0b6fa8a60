//! handover-notify: email rendering and delivery, the email log, and PDF
//! documents attached to notifications.

pub mod error;
pub mod mailer;
pub mod notifier;
pub mod pdf;
pub mod templates;

pub use error::{NotifyError, Result};
pub use mailer::{EmailAttachment, HttpMailer, LogMailer, Mailer, OutgoingEmail, RecordingMailer};
pub use notifier::{Delivery, Notification, Notifier};
pub use pdf::{format_money, PdfDocument};
pub use templates::{RenderedEmail, TemplateEngine};
