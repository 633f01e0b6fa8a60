//! Statements of account, proofs of payment, penalties and NOCs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use handover_common::ApiError;
use handover_core::services::{NewPenalty, NewPop, NewSoa};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthCaller;
use crate::handlers::pdf_response;
use crate::state::{AppEvent, SharedState};

/// GET /api/units/{id}/finance
pub async fn summary(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.finance.summary(&caller, unit_id).await?))
}

// === SOA ===

/// POST /api/units/{id}/soas
pub async fn generate_soa(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
    Json(input): Json<NewSoa>,
) -> Result<impl IntoResponse, ApiError> {
    let soa = state.services.finance.generate_soa(&caller, unit_id, input).await?;
    Ok((StatusCode::CREATED, Json(soa)))
}

/// GET /api/units/{id}/soas
pub async fn list_soas(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.finance.list_soas(&caller, unit_id).await?))
}

/// GET /api/soas/{id}/pdf
pub async fn soa_pdf(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (soa, bytes) = state.services.finance.soa_pdf(&caller, id).await?;
    Ok(pdf_response(&format!("soa-{}.pdf", soa.id), bytes))
}

// === POP ===

/// POST /api/units/{id}/pops
pub async fn submit_pop(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
    Json(input): Json<NewPop>,
) -> Result<impl IntoResponse, ApiError> {
    let pop = state.services.finance.submit_pop(&caller, unit_id, input).await?;
    Ok((StatusCode::CREATED, Json(pop)))
}

#[derive(Debug, Deserialize)]
pub struct PopReview {
    pub approve: bool,
    #[serde(default)]
    pub mark_cleared: bool,
}

/// POST /api/pops/{id}/review
pub async fn review_pop(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<PopReview>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .finance
        .review_pop(&caller, id, input.approve, input.mark_cleared)
        .await?;

    if let Some(status) = outcome.payment_status {
        state.publish(AppEvent::PaymentStatusChanged { unit_id: outcome.pop.unit_id, status });
    }
    Ok(Json(outcome))
}

// === Penalties ===

/// GET /api/units/{id}/penalties
pub async fn list_penalties(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.finance.list_penalties(&caller, unit_id).await?))
}

/// POST /api/units/{id}/penalties
pub async fn add_penalty(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
    Json(input): Json<NewPenalty>,
) -> Result<impl IntoResponse, ApiError> {
    let penalty = state.services.finance.add_penalty(&caller, unit_id, input).await?;
    Ok((StatusCode::CREATED, Json(penalty)))
}

/// POST /api/penalties/{id}/waive
pub async fn waive_penalty(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.finance.waive_penalty(&caller, id).await?))
}

// === NOC ===

/// POST /api/units/{id}/nocs
pub async fn issue_noc(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let noc = state.services.finance.issue_noc(&caller, unit_id).await?;
    Ok((StatusCode::CREATED, Json(noc)))
}

/// GET /api/nocs/{id}/pdf
pub async fn noc_pdf(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (noc, bytes) = state.services.finance.noc_pdf(&caller, id).await?;
    Ok(pdf_response(&format!("noc-{}.pdf", noc.id), bytes))
}
