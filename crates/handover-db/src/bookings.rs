//! Booking repository.
//!
//! Two partial unique indexes back the booking rules: one confirmed booking
//! per `(property, date, slot)` and one confirmed booking per unit. Writes
//! that would break either surface as [`DbError::Duplicate`].

use crate::database::Database;
use crate::error::Result;
use crate::schema::{Booking, Remark};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use handover_common::{BookingStatus, HandoverStatus};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use std::sync::Arc;
use uuid::Uuid;

async fn insert_booking<'e, E>(executor: E, booking: &Booking) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO bookings (id, unit_id, property_id, owner_id, booking_date, slot_time,
                               status, notes, created_at, updated_at, completed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(booking.id)
    .bind(booking.unit_id)
    .bind(booking.property_id)
    .bind(booking.owner_id)
    .bind(booking.booking_date)
    .bind(booking.slot_time)
    .bind(booking.status)
    .bind(&booking.notes)
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .bind(booking.completed_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Listing filter. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub property_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
    /// Restrict to units this owner is linked to.
    #[serde(skip)]
    pub owner_id: Option<Uuid>,
}

/// Repository for booking operations.
#[derive(Clone)]
pub struct BookingRepository {
    db: Arc<Database>,
}

impl BookingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, booking: &Booking) -> Result<()> {
        insert_booking(self.db.pool(), booking).await
    }

    /// Insert a booking together with its timeline remark and mark the unit
    /// `booked`. Nothing is written when any step fails.
    pub async fn insert_confirmed(&self, booking: &Booking, remark: &Remark) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        insert_booking(&mut *tx, booking).await?;

        sqlx::query(
            "INSERT INTO remarks (id, unit_id, author_email, kind, body, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(remark.id)
        .bind(remark.unit_id)
        .bind(&remark.author_email)
        .bind(remark.kind)
        .bind(&remark.body)
        .bind(remark.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE units SET handover_status = ?, updated_at = ? WHERE id = ?")
            .bind(HandoverStatus::Booked)
            .bind(Utc::now())
            .bind(booking.unit_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(booking)
    }

    /// The unit's confirmed booking, if any.
    pub async fn active_for_unit(&self, unit_id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE unit_id = ? AND status = 'confirmed'",
        )
        .bind(unit_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(booking)
    }

    /// The confirmed booking holding a slot, if any.
    pub async fn slot_holder(
        &self,
        property_id: Uuid,
        date: NaiveDate,
        slot: NaiveTime,
    ) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings
             WHERE property_id = ? AND booking_date = ? AND slot_time = ? AND status = 'confirmed'",
        )
        .bind(property_id)
        .bind(date)
        .bind(slot)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(booking)
    }

    /// Slot times held by confirmed bookings of a property on a date.
    pub async fn taken_slots(&self, property_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        let slots = sqlx::query_scalar::<_, NaiveTime>(
            "SELECT slot_time FROM bookings
             WHERE property_id = ? AND booking_date = ? AND status = 'confirmed'
             ORDER BY slot_time",
        )
        .bind(property_id)
        .bind(date)
        .fetch_all(self.db.pool())
        .await?;
        Ok(slots)
    }

    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT b.* FROM bookings b WHERE 1 = 1");

        if let Some(property_id) = filter.property_id {
            qb.push(" AND b.property_id = ").push_bind(property_id);
        }
        if let Some(unit_id) = filter.unit_id {
            qb.push(" AND b.unit_id = ").push_bind(unit_id);
        }
        if let Some(date) = filter.date {
            qb.push(" AND b.booking_date = ").push_bind(date);
        }
        if let Some(status) = filter.status {
            qb.push(" AND b.status = ").push_bind(status);
        }
        if let Some(owner_id) = filter.owner_id {
            qb.push(" AND b.unit_id IN (SELECT unit_id FROM unit_owners WHERE owner_id = ")
                .push_bind(owner_id)
                .push(")");
        }
        qb.push(" ORDER BY b.booking_date, b.slot_time");

        let rows = qb.build_query_as::<Booking>().fetch_all(self.db.pool()).await?;
        Ok(rows)
    }

    /// Move a booking to another slot.
    pub async fn update_slot(&self, id: Uuid, date: NaiveDate, slot: NaiveTime) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET booking_date = ?, slot_time = ?, updated_at = ? WHERE id = ?",
        )
        .bind(date)
        .bind(slot)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(completed_at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn append_note(&self, id: Uuid, note: &str) -> Result<()> {
        sqlx::query(
            "UPDATE bookings
             SET notes = CASE WHEN notes IS NULL OR notes = '' THEN ? ELSE notes || char(10) || ? END
             WHERE id = ?",
        )
        .bind(note)
        .bind(note)
        .bind(id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}
