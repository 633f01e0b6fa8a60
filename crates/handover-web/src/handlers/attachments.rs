//! Handover document uploads, downloads and review.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use handover_common::{ApiError, HandoverError};
use handover_core::services::Upload;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthCaller;
use crate::handlers::file_response;
use crate::state::SharedState;

fn bad_multipart(err: MultipartError) -> HandoverError {
    HandoverError::Validation(format!("invalid multipart body: {}", err.body_text()))
}

/// GET /api/units/{id}/attachments
pub async fn list_attachments(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.documents.list(&caller, unit_id).await?))
}

/// POST /api/units/{id}/attachments
///
/// Multipart form with a `document_type` text field and a `file` part.
pub async fn upload_attachment(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut document_type = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document_type" => {
                document_type = Some(field.text().await.map_err(bad_multipart)?);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    let document_type = document_type
        .ok_or_else(|| HandoverError::Validation("document_type is required".to_string()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| HandoverError::Validation("file is required".to_string()))?;

    let upload = Upload { document_type, file_name, content_type, bytes };
    let attachment = state.services.documents.upload(&caller, unit_id, upload).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

/// GET /api/attachments/{id}
pub async fn download_attachment(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (attachment, bytes) = state.services.documents.download(&caller, id).await?;
    Ok(file_response(&attachment.content_type, &attachment.file_name, bytes))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
    pub note: Option<String>,
}

/// POST /api/attachments/{id}/review
pub async fn review_attachment(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .services
            .documents
            .review(&caller, id, input.approve, input.note)
            .await?,
    ))
}

/// DELETE /api/attachments/{id}
pub async fn delete_attachment(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.documents.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
