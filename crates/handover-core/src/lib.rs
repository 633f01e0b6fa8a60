//! handover-core: booking rules, co-owner consistency and the application
//! services behind the Handover API.
//!
//! Pure rules live in [`access`], [`slots`] and [`eligibility`]; the
//! [`services`] combine them with the store and notifications.

pub mod access;
pub mod context;
pub mod eligibility;
pub mod services;
pub mod slots;

pub use access::AdminAllowlist;
pub use context::ServiceContext;
pub use eligibility::{Eligibility, SyncState};
pub use services::Services;
pub use slots::SlotGrid;
