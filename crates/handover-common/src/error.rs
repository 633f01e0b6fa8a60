use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::entities::IneligibleReason;

#[derive(Debug, Error)]
pub enum HandoverError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unit is not eligible for booking: {}", join_reasons(.0))]
    Ineligible(Vec<IneligibleReason>),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_reasons(reasons: &[IneligibleReason]) -> String {
    reasons
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl HandoverError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        HandoverError::NotFound(what.to_string())
    }

    pub fn forbidden(what: impl std::fmt::Display) -> Self {
        HandoverError::Forbidden(what.to_string())
    }

    /// Stable machine-readable code returned in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            HandoverError::NotFound(_) => "not_found",
            HandoverError::Conflict(_) => "conflict",
            HandoverError::Forbidden(_) => "forbidden",
            HandoverError::Unauthorized => "unauthorized",
            HandoverError::Validation(_) => "validation_failed",
            HandoverError::Ineligible(_) => "not_eligible",
            _ => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HandoverError::NotFound(_) => StatusCode::NOT_FOUND,
            HandoverError::Conflict(_) | HandoverError::Ineligible(_) => StatusCode::CONFLICT,
            HandoverError::Forbidden(_) => StatusCode::FORBIDDEN,
            HandoverError::Unauthorized => StatusCode::UNAUTHORIZED,
            HandoverError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, HandoverError>;

/// Error returned by axum handlers.
#[derive(Debug)]
pub struct ApiError(pub HandoverError);

impl From<HandoverError> for ApiError {
    fn from(err: HandoverError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        // Internal details stay in the log
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let mut body = json!({
            "error": self.0.code(),
            "message": message,
        });
        if let HandoverError::Ineligible(reasons) = &self.0 {
            body["reasons"] = json!(reasons);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(HandoverError::not_found("unit").status(), StatusCode::NOT_FOUND);
        assert_eq!(HandoverError::Conflict("slot".into()).status(), StatusCode::CONFLICT);
        assert_eq!(HandoverError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(HandoverError::Validation("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(HandoverError::Mail("smtp down".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ineligible_message_lists_reasons() {
        let err = HandoverError::Ineligible(vec![
            IneligibleReason::PaymentNotCleared,
            IneligibleReason::DocumentsNotApproved,
        ]);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Unit is not eligible for booking: payment_not_cleared, documents_not_approved"
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let resp = ApiError(HandoverError::Pdf("font table corrupt".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "internal server error");
    }
}
