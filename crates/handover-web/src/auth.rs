//! Bearer-token caller extraction.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use handover_common::{ApiError, Caller, HandoverError};

use crate::state::SharedState;

/// The authenticated caller of a request.
///
/// Resolved from `Authorization: Bearer <token>`, where the token comes from
/// a magic link or a developer link. Missing or unknown tokens are a 401.
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Caller);

impl FromRequestParts<SharedState> for AuthCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError(HandoverError::Unauthorized))?;

        let caller = state.services.auth.authenticate(bearer.token()).await?;
        tracing::debug!(email = %caller.email, "Authenticated request");
        Ok(AuthCaller(caller))
    }
}
