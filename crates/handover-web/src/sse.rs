//! Server-Sent Events (SSE) streaming for admin dashboards.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use handover_common::ApiError;
use handover_core::access::require_admin;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::auth::AuthCaller;
use crate::state::SharedState;

/// GET /api/events
pub async fn sse_handler(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require_admin(&caller)?;

    // lagged receivers skip what they missed
    let stream = BroadcastStream::new(state.subscribe()).filter_map(|result| {
        result.ok().and_then(|event| {
            serde_json::to_string(&event)
                .ok()
                .map(|data| Ok(Event::default().data(data)))
        })
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
