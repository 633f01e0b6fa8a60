//! handover-web: JSON API for the Handover admin system.
//! Provides:
//!   - Magic-link and developer-link sign-in
//!   - Property, unit and co-owner management
//!   - Handover booking with slot conflict checks
//!   - Document uploads, finance records and PDFs
//!   - Live booking events over SSE

pub mod auth;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
