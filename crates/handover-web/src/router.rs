//! Axum router: maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{attachments, auth, bookings, finance, properties, system, units};
use crate::sse::sse_handler;
use crate::state::{AppState, SharedState};

/// Headroom over the upload limit for multipart framing and text fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.services.ctx.config.storage.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/health", get(system::health))

        // Sign-in
        .route("/api/auth/magic-link", post(auth::request_magic_link))
        .route("/api/auth/verify",     post(auth::verify))
        .route("/api/auth/me",         get(auth::me))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Properties
        .route("/api/properties",      get(properties::list_properties).post(properties::create_property))
        .route("/api/properties/{id}", get(properties::get_property)
            .patch(properties::update_property)
            .delete(properties::delete_property))
        .route("/api/properties/{id}/units",        get(properties::list_units).post(properties::create_unit))
        .route("/api/properties/{id}/availability", get(properties::availability))
        .route("/api/properties/{id}/developer-links",
            get(properties::list_developer_links).post(properties::create_developer_link))
        .route("/api/developer-links/{id}", delete(properties::revoke_developer_link))

        // Units and co-owners
        .route("/api/units/{id}",                  get(units::get_unit).patch(units::update_unit))
        .route("/api/units/{id}/refresh-status",   post(units::refresh_status))
        .route("/api/units/{id}/eligibility",      get(units::eligibility))
        .route("/api/units/{id}/owners",           get(units::list_owners).post(units::attach_owner))
        .route("/api/units/{id}/owners/{owner_id}", delete(units::detach_owner))
        .route("/api/units/{id}/payment-status",   put(units::set_payment_status))
        .route("/api/units/{id}/documents-status", put(units::set_documents_status))
        .route("/api/units/{id}/sync",             get(units::sync_state))
        .route("/api/units/{id}/sync/repair",      post(units::repair_sync))
        .route("/api/units/{id}/remarks",          get(units::list_remarks).post(units::add_remark))

        // Documents
        .route("/api/units/{id}/attachments",
            get(attachments::list_attachments).post(attachments::upload_attachment))
        .route("/api/attachments/{id}",
            get(attachments::download_attachment).delete(attachments::delete_attachment))
        .route("/api/attachments/{id}/review", post(attachments::review_attachment))

        // Finance
        .route("/api/units/{id}/finance",   get(finance::summary))
        .route("/api/units/{id}/soas",      get(finance::list_soas).post(finance::generate_soa))
        .route("/api/soas/{id}/pdf",        get(finance::soa_pdf))
        .route("/api/units/{id}/pops",      post(finance::submit_pop))
        .route("/api/pops/{id}/review",     post(finance::review_pop))
        .route("/api/units/{id}/penalties", get(finance::list_penalties).post(finance::add_penalty))
        .route("/api/penalties/{id}/waive", post(finance::waive_penalty))
        .route("/api/units/{id}/nocs",      post(finance::issue_noc))
        .route("/api/nocs/{id}/pdf",        get(finance::noc_pdf))

        // Bookings
        .route("/api/bookings",                get(bookings::list_bookings).post(bookings::create_booking))
        .route("/api/bookings/{id}",           get(bookings::get_booking))
        .route("/api/bookings/{id}/reschedule", post(bookings::reschedule_booking))
        .route("/api/bookings/{id}/cancel",    post(bookings::cancel_booking))
        .route("/api/bookings/{id}/complete",  post(bookings::complete_booking))
        .route("/api/bookings/{id}/pdf",       get(bookings::booking_pdf))

        // Admin
        .route("/api/stats",      get(system::stats))
        .route("/api/email-logs", get(system::email_logs))

        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
