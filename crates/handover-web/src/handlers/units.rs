//! Unit detail, co-owners, shared status and the unit timeline.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use handover_common::{ApiError, DocumentsStatus, PaymentStatus};
use handover_core::services::{AttachOwner, UnitUpdate};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthCaller;
use crate::state::{AppEvent, SharedState};

/// GET /api/units/{id}
pub async fn get_unit(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.units.get(&caller, id).await?))
}

/// PATCH /api/units/{id}
pub async fn update_unit(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(update): Json<UnitUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.units.update(&caller, id, update).await?))
}

/// POST /api/units/{id}/refresh-status
pub async fn refresh_status(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.services.units.refresh_status(&caller, id).await?;
    Ok(Json(json!({ "unit_id": id, "handover_status": status })))
}

/// GET /api/units/{id}/eligibility
pub async fn eligibility(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.bookings.check_eligibility(&caller, id).await?))
}

// === Co-owners ===

/// GET /api/units/{id}/owners
pub async fn list_owners(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.ownership.owners(&caller, id).await?))
}

/// POST /api/units/{id}/owners
pub async fn attach_owner(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<AttachOwner>,
) -> Result<impl IntoResponse, ApiError> {
    let owners = state.services.ownership.attach_owner(&caller, id, input).await?;
    Ok((StatusCode::CREATED, Json(owners)))
}

/// DELETE /api/units/{id}/owners/{owner_id}
pub async fn detach_owner(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path((id, owner_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.ownership.detach_owner(&caller, id, owner_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
}

/// PUT /api/units/{id}/payment-status
pub async fn set_payment_status(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<PaymentUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let owners = state.services.ownership.set_payment_status(&caller, id, input.status).await?;
    state.publish(AppEvent::PaymentStatusChanged { unit_id: id, status: input.status });
    Ok(Json(owners))
}

#[derive(Debug, Deserialize)]
pub struct DocumentsUpdate {
    pub status: DocumentsStatus,
    pub note: Option<String>,
}

/// PUT /api/units/{id}/documents-status
pub async fn set_documents_status(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<DocumentsUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .services
            .ownership
            .set_documents_status(&caller, id, input.status, input.note)
            .await?,
    ))
}

/// GET /api/units/{id}/sync
pub async fn sync_state(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.ownership.sync_state(&caller, id).await?))
}

/// POST /api/units/{id}/sync/repair
pub async fn repair_sync(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.ownership.repair_sync(&caller, id).await?))
}

// === Remarks ===

#[derive(Debug, Deserialize)]
pub struct NewRemark {
    pub body: String,
}

/// GET /api/units/{id}/remarks
pub async fn list_remarks(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.remarks.list(&caller, id).await?))
}

/// POST /api/units/{id}/remarks
pub async fn add_remark(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<NewRemark>,
) -> Result<impl IntoResponse, ApiError> {
    let remark = state.services.remarks.add(&caller, id, &input.body).await?;
    Ok((StatusCode::CREATED, Json(remark)))
}
