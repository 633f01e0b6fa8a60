//! handover-common: Shared types, errors, and caller identities used across all Handover crates.

pub mod error;
pub mod entities;
pub mod caller;

// Re-export commonly used types
pub use caller::{Caller, Role};
pub use entities::{
    BookingStatus, DocumentsStatus, EmailStatus, HandoverStatus, IneligibleReason,
    PaymentStatus, RemarkKind, ReviewStatus,
};
pub use error::{ApiError, HandoverError, Result};
