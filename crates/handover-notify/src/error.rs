use handover_common::HandoverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail provider error [{status}]: {message}")]
    Provider { status: u16, message: String },

    #[error("Mail transport unavailable: {0}")]
    Unavailable(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NotifyError> for HandoverError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Template(e) => HandoverError::Template(e.to_string()),
            NotifyError::Pdf(e) => HandoverError::Pdf(e.to_string()),
            NotifyError::Io(e) => HandoverError::Pdf(e.to_string()),
            other => HandoverError::Mail(other.to_string()),
        }
    }
}
