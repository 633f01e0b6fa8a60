//! Health, admin stats and the outbound email log.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use handover_common::ApiError;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthCaller;
use crate::state::SharedState;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "mail_transport": state.services.ctx.notifier.transport(),
    }))
}

/// GET /api/stats
pub async fn stats(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.properties.stats(&caller).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailLogQuery {
    pub unit_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// GET /api/email-logs?unit_id=&limit=
pub async fn email_logs(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Query(query): Query<EmailLogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .services
            .remarks
            .email_logs(&caller, query.unit_id, query.limit)
            .await?,
    ))
}
