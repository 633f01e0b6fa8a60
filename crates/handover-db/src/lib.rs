//! Handover Database Layer
//!
//! This crate provides an embedded SQLite store for properties, units,
//! owners, bookings, the unit timeline, finance records, sign-in links and
//! the outbound email log, plus a local file store for uploads and PDFs.
//!
//! # Features
//!
//! - Embedded database (no external server required)
//! - Booking conflicts backed by partial unique indexes
//! - One repository per table, sharing a single [`Database`] handle
//!
//! # Example
//!
//! ```rust,no_run
//! use handover_db::{Database, Property, PropertyRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Open database
//!     let db = Database::open("sqlite://handover.db", 5).await?;
//!     db.initialize().await?;
//!
//!     // Use repositories
//!     let db = std::sync::Arc::new(db);
//!     let properties = PropertyRepository::new(db.clone());
//!     properties
//!         .insert(&Property::new("Marina Heights".to_string(), "Acme Developments".to_string()))
//!         .await?;
//!     println!("{} properties", db.stats().await?.properties);
//!
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;
pub mod tokens;
pub mod files;
pub mod properties;
pub mod units;
pub mod owners;
pub mod bookings;
pub mod remarks;
pub mod attachments;
pub mod finance;
pub mod magic_links;
pub mod email_logs;

pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
pub use files::FileStore;
pub use schema::{
    Attachment, Booking, DeveloperMagicLink, EmailLog, FinanceNoc, FinancePenalty, FinancePop,
    FinanceSoa, MagicLink, Owner, Property, Remark, Unit, UnitOwner,
};
pub use properties::PropertyRepository;
pub use units::{NewLink, UnitRepository};
pub use owners::OwnerRepository;
pub use bookings::{BookingFilter, BookingRepository};
pub use remarks::RemarkRepository;
pub use attachments::AttachmentRepository;
pub use finance::FinanceRepository;
pub use magic_links::MagicLinkRepository;
pub use email_logs::EmailLogRepository;
