//! Handover appointment booking endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use handover_common::{ApiError, HandoverError};
use handover_core::services::{NewBooking, Reschedule};
use handover_db::{Booking, BookingFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthCaller;
use crate::handlers::pdf_response;
use crate::state::{AppEvent, SharedState};

fn slot_label(booking: &Booking) -> String {
    booking.slot_time.format("%H:%M").to_string()
}

/// GET /api/bookings?property_id=&unit_id=&date=&status=
pub async fn list_bookings(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Query(filter): Query<BookingFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.bookings.list(&caller, filter).await?))
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Json(input): Json<NewBooking>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.services.bookings.create(&caller, input).await?;
    state.publish(AppEvent::BookingCreated {
        booking_id: booking.id,
        unit_id: booking.unit_id,
        property_id: booking.property_id,
        date: booking.booking_date,
        slot: slot_label(&booking),
    });
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /api/bookings/{id}
pub async fn get_booking(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.bookings.get(&caller, id).await?))
}

/// POST /api/bookings/{id}/reschedule
pub async fn reschedule_booking(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    Json(input): Json<Reschedule>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.services.bookings.reschedule(&caller, id, input).await?;
    state.publish(AppEvent::BookingRescheduled {
        booking_id: booking.id,
        unit_id: booking.unit_id,
        property_id: booking.property_id,
        date: booking.booking_date,
        slot: slot_label(&booking),
    });
    Ok(Json(booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// POST /api/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // the body is optional
    let input: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| HandoverError::Validation(format!("invalid request body: {}", e)))?
    };
    let booking = state.services.bookings.cancel(&caller, id, input.reason).await?;
    state.publish(AppEvent::BookingCancelled {
        booking_id: booking.id,
        unit_id: booking.unit_id,
        property_id: booking.property_id,
    });
    Ok(Json(booking))
}

/// POST /api/bookings/{id}/complete
pub async fn complete_booking(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.services.bookings.complete(&caller, id).await?;
    state.publish(AppEvent::HandoverCompleted {
        booking_id: booking.id,
        unit_id: booking.unit_id,
        property_id: booking.property_id,
    });
    Ok(Json(booking))
}

/// GET /api/bookings/{id}/pdf
pub async fn booking_pdf(
    State(state): State<SharedState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (booking, bytes) = state.services.bookings.pdf(&caller, id).await?;
    Ok(pdf_response(&format!("booking-{}.pdf", booking.id), bytes))
}
