//! Magic-link sign-in.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use handover_common::ApiError;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthCaller;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

/// POST /api/auth/magic-link
///
/// Always 202, whether or not the address is known.
pub async fn request_magic_link(
    State(state): State<SharedState>,
    Json(input): Json<MagicLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.auth.request_magic_link(&input.email).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// POST /api/auth/verify
pub async fn verify(
    State(state): State<SharedState>,
    Json(input): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.auth.verify(&input.token).await?))
}

/// GET /api/auth/me
pub async fn me(AuthCaller(caller): AuthCaller) -> impl IntoResponse {
    Json(caller)
}
