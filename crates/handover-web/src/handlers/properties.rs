//! Properties, their units and developer access links.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use handover_common::ApiError;
use handover_core::services::{NewProperty, NewUnit, PropertyUpdate};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthCaller;
use crate::state::SharedState;

/// GET /api/properties
pub async fn list_properties(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.properties.list(&caller).await?))
}

/// POST /api/properties
pub async fn create_property(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Json(input): Json<NewProperty>,
) -> Result<impl IntoResponse, ApiError> {
    let property = state.services.properties.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

/// GET /api/properties/{id}
pub async fn get_property(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.properties.get(&caller, id).await?))
}

/// PATCH /api/properties/{id}
pub async fn update_property(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(update): Json<PropertyUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.properties.update(&caller, id, update).await?))
}

/// DELETE /api/properties/{id}
pub async fn delete_property(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.properties.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// === Units ===

/// GET /api/properties/{id}/units
pub async fn list_units(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(property_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.units.list(&caller, property_id).await?))
}

/// POST /api/properties/{id}/units
pub async fn create_unit(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(property_id): Path<Uuid>,
    Json(input): Json<NewUnit>,
) -> Result<impl IntoResponse, ApiError> {
    let unit = state.services.units.create(&caller, property_id, input).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

/// GET /api/properties/{id}/availability?date=YYYY-MM-DD
pub async fn availability(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(property_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.bookings.availability(&caller, property_id, query.date).await?))
}

// === Developer links ===

#[derive(Debug, Deserialize)]
pub struct DeveloperLinkRequest {
    pub email: String,
}

/// GET /api/properties/{id}/developer-links
pub async fn list_developer_links(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(property_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.auth.list_developer_links(&caller, property_id).await?))
}

/// POST /api/properties/{id}/developer-links
pub async fn create_developer_link(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(property_id): Path<Uuid>,
    Json(input): Json<DeveloperLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .services
        .auth
        .create_developer_link(&caller, property_id, &input.email)
        .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// DELETE /api/developer-links/{id}
pub async fn revoke_developer_link(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.auth.revoke_developer_link(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
