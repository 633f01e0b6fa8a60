//! HTTP handlers for all API routes.

pub mod attachments;
pub mod auth;
pub mod bookings;
pub mod finance;
pub mod properties;
pub mod system;
pub mod units;

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// A file download with an attachment disposition.
pub(crate) fn file_response(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

pub(crate) fn pdf_response(file_name: &str, bytes: Vec<u8>) -> Response {
    file_response("application/pdf", file_name, bytes)
}
