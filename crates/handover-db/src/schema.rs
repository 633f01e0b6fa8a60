//! Table definitions and row types.
//!
//! Identifiers are UUIDs (stored as BLOB), timestamps are UTC, dates and slot
//! times are stored as ISO text, and money is integer minor units.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use handover_common::{
    BookingStatus, DocumentsStatus, EmailStatus, HandoverStatus, PaymentStatus, RemarkKind,
    ReviewStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TABLE_PROPERTIES: &str = "properties";
pub const TABLE_UNITS: &str = "units";
pub const TABLE_OWNERS: &str = "owners";
pub const TABLE_BOOKINGS: &str = "bookings";
pub const TABLE_REMARKS: &str = "remarks";
pub const TABLE_ATTACHMENTS: &str = "attachments";
pub const TABLE_EMAIL_LOGS: &str = "email_logs";

/// Statements run by [`crate::Database::initialize`], in order.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS properties (
        id              BLOB PRIMARY KEY NOT NULL,
        name            TEXT NOT NULL,
        developer_name  TEXT NOT NULL,
        location        TEXT,
        handover_start  TEXT,
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS units (
        id               BLOB PRIMARY KEY NOT NULL,
        property_id      BLOB NOT NULL REFERENCES properties(id),
        unit_number      TEXT NOT NULL,
        unit_type        TEXT,
        floor            INTEGER,
        area_sqft        REAL,
        handover_status  TEXT NOT NULL DEFAULT 'pending',
        created_at       TEXT NOT NULL,
        updated_at       TEXT NOT NULL,
        UNIQUE (property_id, unit_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS owners (
        id          BLOB PRIMARY KEY NOT NULL,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL UNIQUE,
        phone       TEXT,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS unit_owners (
        unit_id           BLOB NOT NULL REFERENCES units(id) ON DELETE CASCADE,
        owner_id          BLOB NOT NULL REFERENCES owners(id),
        is_primary        INTEGER NOT NULL DEFAULT 0,
        payment_status    TEXT NOT NULL DEFAULT 'pending',
        documents_status  TEXT NOT NULL DEFAULT 'missing',
        linked_at         TEXT NOT NULL,
        PRIMARY KEY (unit_id, owner_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bookings (
        id            BLOB PRIMARY KEY NOT NULL,
        unit_id       BLOB NOT NULL REFERENCES units(id),
        property_id   BLOB NOT NULL REFERENCES properties(id),
        owner_id      BLOB NOT NULL REFERENCES owners(id),
        booking_date  TEXT NOT NULL,
        slot_time     TEXT NOT NULL,
        status        TEXT NOT NULL DEFAULT 'confirmed',
        notes         TEXT,
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL,
        completed_at  TEXT
    )
    "#,
    // One active booking per property slot, one active booking per unit.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active_slot
        ON bookings (property_id, booking_date, slot_time)
        WHERE status = 'confirmed'
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active_unit
        ON bookings (unit_id)
        WHERE status = 'confirmed'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS remarks (
        id            BLOB PRIMARY KEY NOT NULL,
        unit_id       BLOB NOT NULL REFERENCES units(id) ON DELETE CASCADE,
        author_email  TEXT NOT NULL,
        kind          TEXT NOT NULL,
        body          TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attachments (
        id             BLOB PRIMARY KEY NOT NULL,
        unit_id        BLOB NOT NULL REFERENCES units(id),
        owner_id       BLOB REFERENCES owners(id),
        document_type  TEXT NOT NULL,
        file_name      TEXT NOT NULL,
        stored_path    TEXT NOT NULL,
        content_type   TEXT NOT NULL,
        size_bytes     INTEGER NOT NULL,
        review_status  TEXT NOT NULL DEFAULT 'pending',
        reviewed_by    TEXT,
        created_at     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS finance_soas (
        id                BLOB PRIMARY KEY NOT NULL,
        unit_id           BLOB NOT NULL REFERENCES units(id),
        total_due_cents   INTEGER NOT NULL,
        total_paid_cents  INTEGER NOT NULL,
        generated_by      TEXT NOT NULL,
        pdf_path          TEXT NOT NULL,
        created_at        TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS finance_pops (
        id             BLOB PRIMARY KEY NOT NULL,
        unit_id        BLOB NOT NULL REFERENCES units(id),
        owner_id       BLOB REFERENCES owners(id),
        amount_cents   INTEGER NOT NULL,
        reference      TEXT NOT NULL,
        attachment_id  BLOB REFERENCES attachments(id) ON DELETE SET NULL,
        status         TEXT NOT NULL DEFAULT 'pending',
        reviewed_by    TEXT,
        created_at     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS finance_penalties (
        id            BLOB PRIMARY KEY NOT NULL,
        unit_id       BLOB NOT NULL REFERENCES units(id),
        amount_cents  INTEGER NOT NULL,
        reason        TEXT NOT NULL,
        waived        INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS finance_nocs (
        id          BLOB PRIMARY KEY NOT NULL,
        unit_id     BLOB NOT NULL REFERENCES units(id),
        issued_by   TEXT NOT NULL,
        pdf_path    TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS magic_links (
        id          BLOB PRIMARY KEY NOT NULL,
        email       TEXT NOT NULL,
        token_hash  TEXT NOT NULL UNIQUE,
        expires_at  TEXT NOT NULL,
        used_at     TEXT,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS developer_magic_links (
        id           BLOB PRIMARY KEY NOT NULL,
        property_id  BLOB NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
        email        TEXT NOT NULL,
        token_hash   TEXT NOT NULL UNIQUE,
        expires_at   TEXT NOT NULL,
        revoked      INTEGER NOT NULL DEFAULT 0,
        created_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS email_logs (
        id          BLOB PRIMARY KEY NOT NULL,
        recipient   TEXT NOT NULL,
        subject     TEXT NOT NULL,
        template    TEXT NOT NULL,
        status      TEXT NOT NULL,
        error       TEXT,
        unit_id     BLOB,
        created_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_units_property ON units (property_id)",
    "CREATE INDEX IF NOT EXISTS idx_remarks_unit ON remarks (unit_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_email_logs_unit ON email_logs (unit_id)",
];

// =============================================================================
// Property / Unit / Owner
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub developer_name: String,
    pub location: Option<String>,
    pub handover_start: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Property {
    pub fn new(name: String, developer_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            developer_name,
            location: None,
            handover_start: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub property_id: Uuid,
    pub unit_number: String,
    pub unit_type: Option<String>,
    pub floor: Option<i64>,
    pub area_sqft: Option<f64>,
    pub handover_status: HandoverStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    pub fn new(property_id: Uuid, unit_number: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_id,
            unit_number,
            unit_type: None,
            floor: None,
            area_sqft: None,
            handover_status: HandoverStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Owner {
    /// Emails are stored trimmed and lowercase.
    pub fn new(name: String, email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: email.trim().to_lowercase(),
            phone: None,
            created_at: Utc::now(),
        }
    }
}

/// An owner as linked to one unit, with the shared co-owner state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnitOwner {
    pub unit_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_primary: bool,
    pub payment_status: PaymentStatus,
    pub documents_status: DocumentsStatus,
    pub linked_at: DateTime<Utc>,
}

// =============================================================================
// Bookings and timeline
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub property_id: Uuid,
    pub owner_id: Uuid,
    pub booking_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(
        unit: &Unit,
        owner_id: Uuid,
        booking_date: NaiveDate,
        slot_time: NaiveTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            unit_id: unit.id,
            property_id: unit.property_id,
            owner_id,
            booking_date,
            slot_time,
            status: BookingStatus::Confirmed,
            notes: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Remark {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub author_email: String,
    pub kind: RemarkKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Remark {
    pub fn new(unit_id: Uuid, author_email: &str, kind: RemarkKind, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            author_email: author_email.to_string(),
            kind,
            body,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub document_type: String,
    pub file_name: String,
    /// Relative to the storage root; never exposed over the API.
    #[serde(skip)]
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub review_status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Finance
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinanceSoa {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub total_due_cents: i64,
    pub total_paid_cents: i64,
    pub generated_by: String,
    #[serde(skip)]
    pub pdf_path: String,
    pub created_at: DateTime<Utc>,
}

impl FinanceSoa {
    pub fn balance_cents(&self) -> i64 {
        self.total_due_cents - self.total_paid_cents
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinancePop {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub amount_cents: i64,
    pub reference: String,
    pub attachment_id: Option<Uuid>,
    pub status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinancePenalty {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub amount_cents: i64,
    pub reason: String,
    pub waived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinanceNoc {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub issued_by: String,
    #[serde(skip)]
    pub pdf_path: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sign-in links and email log
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MagicLink {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MagicLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeveloperMagicLink {
    pub id: Uuid,
    pub property_id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl DeveloperMagicLink {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailLog {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub template: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub unit_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
