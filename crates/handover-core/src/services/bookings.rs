//! Handover appointment booking.
//!
//! Conflicts are checked up front for a clear error, and the partial unique
//! indexes on `bookings` catch whatever races past the checks. Both paths
//! report the same conflict.

use crate::access::{ensure_manage_unit, ensure_view_unit, require_admin};
use crate::context::{with_fields, ServiceContext};
use crate::eligibility::{self, Eligibility};
use chrono::{NaiveDate, NaiveTime, Utc};
use handover_common::{
    BookingStatus, Caller, HandoverError, HandoverStatus, RemarkKind, Result, Role,
};
use handover_db::{Booking, BookingFilter, DbError, Property, Remark, Unit, UnitOwner};
use handover_notify::{pdf, EmailAttachment, Notification};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub unit_id: Uuid,
    pub booking_date: NaiveDate,
    #[serde(with = "slot_time")]
    pub slot_time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reschedule {
    pub booking_date: NaiveDate,
    #[serde(with = "slot_time")]
    pub slot_time: NaiveTime,
}

/// Free slots of a property on one day.
#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub property_id: Uuid,
    pub date: NaiveDate,
    #[serde(serialize_with = "slot_time::serialize_all")]
    pub slots: Vec<NaiveTime>,
    #[serde(serialize_with = "slot_time::serialize_all")]
    pub available: Vec<NaiveTime>,
}

/// Slot times travel as `HH:MM` (seconds accepted on input).
pub mod slot_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn serialize_all<S: Serializer>(times: &[NaiveTime], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(times.iter().map(|t| t.format("%H:%M").to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid slot time '{}'", raw)))
    }
}

fn slot_conflict(err: DbError) -> HandoverError {
    match err {
        DbError::Duplicate(_) => {
            HandoverError::Conflict("the slot or the unit already has an active booking".to_string())
        }
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct BookingService {
    ctx: Arc<ServiceContext>,
}

impl BookingService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    async fn booking(&self, id: Uuid) -> Result<Booking> {
        self.ctx
            .bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("booking {}", id)))
    }

    fn booking_context(property: &Property, unit: &Unit, booking: &Booking) -> serde_json::Value {
        with_fields(
            ServiceContext::unit_context(property, unit),
            json!({
                "date": booking.booking_date.format("%A %d %B %Y").to_string(),
                "time": booking.slot_time.format("%H:%M").to_string(),
                "notes": booking.notes,
            }),
        )
    }

    // ── Availability ─────────────────────────────────────────────────────────

    pub async fn availability(
        &self,
        caller: &Caller,
        property_id: Uuid,
        date: NaiveDate,
    ) -> Result<DayAvailability> {
        if let Role::Developer { property_id: own } = caller.role {
            if own != property_id {
                return Err(HandoverError::forbidden("no access to this property"));
            }
        }
        self.ctx.property(property_id).await?;
        let taken = self.ctx.bookings.taken_slots(property_id, date).await?;
        Ok(DayAvailability {
            property_id,
            date,
            slots: self.ctx.grid.slots(date),
            available: self.ctx.grid.available(date, &taken),
        })
    }

    pub async fn check_eligibility(&self, caller: &Caller, unit_id: Uuid) -> Result<Eligibility> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        let active = self.ctx.bookings.active_for_unit(unit_id).await?.is_some();
        Ok(eligibility::evaluate(&owners, active, unit.handover_status))
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    pub async fn create(&self, caller: &Caller, input: NewBooking) -> Result<Booking> {
        let (unit, owners) = self.ctx.unit_with_owners(input.unit_id).await?;
        ensure_manage_unit(caller, &unit, &owners)?;

        self.ctx.grid.validate(input.booking_date, input.slot_time, self.ctx.today())?;

        let active = self.ctx.bookings.active_for_unit(unit.id).await?;
        let eligibility = eligibility::evaluate(&owners, active.is_some(), unit.handover_status);
        if !eligibility.eligible {
            return Err(HandoverError::Ineligible(eligibility.reasons));
        }

        if self
            .ctx
            .bookings
            .slot_holder(unit.property_id, input.booking_date, input.slot_time)
            .await?
            .is_some()
        {
            return Err(HandoverError::Conflict(format!(
                "{} {} is already booked",
                input.booking_date,
                input.slot_time.format("%H:%M")
            )));
        }

        // Owners book in their own name; admins book for the primary owner.
        let booked_by = match caller.owner_id() {
            Some(owner_id) => owner_id,
            None => owners
                .first()
                .map(|o| o.owner_id)
                .ok_or(HandoverError::Ineligible(vec![handover_common::IneligibleReason::NoOwners]))?,
        };

        let mut booking = Booking::new(&unit, booked_by, input.booking_date, input.slot_time);
        booking.notes = input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let remark = Remark::new(
            unit.id,
            &caller.email,
            RemarkKind::Booking,
            format!(
                "Handover booked for {} at {}",
                booking.booking_date,
                booking.slot_time.format("%H:%M")
            ),
        );
        self.ctx
            .bookings
            .insert_confirmed(&booking, &remark)
            .await
            .map_err(slot_conflict)?;

        tracing::info!(
            booking_id = %booking.id,
            unit_id = %unit.id,
            date = %booking.booking_date,
            slot = %booking.slot_time,
            "Booking created"
        );

        let property = self.ctx.property(unit.property_id).await?;
        let mut notification = Notification::new(
            "booking_confirmed",
            Self::booking_context(&property, &unit, &booking),
        )
        .for_unit(unit.id);
        match pdf::booking_confirmation(&property, &unit, &booking, &owners) {
            Ok(bytes) => {
                notification = notification
                    .attach(EmailAttachment::pdf(format!("booking-{}.pdf", unit.unit_number), bytes));
            }
            Err(e) => tracing::warn!(booking_id = %booking.id, error = %e, "Booking PDF failed"),
        }
        self.ctx.notify_owners(&owners, notification).await;

        Ok(booking)
    }

    pub async fn reschedule(&self, caller: &Caller, id: Uuid, input: Reschedule) -> Result<Booking> {
        let booking = self.booking(id).await?;
        let (unit, owners) = self.ctx.unit_with_owners(booking.unit_id).await?;
        ensure_manage_unit(caller, &unit, &owners)?;
        if !booking.status.is_active() {
            return Err(HandoverError::Conflict(format!("booking is {}", booking.status)));
        }

        if booking.booking_date == input.booking_date && booking.slot_time == input.slot_time {
            return Ok(booking);
        }

        self.ctx.grid.validate(input.booking_date, input.slot_time, self.ctx.today())?;
        if let Some(holder) = self
            .ctx
            .bookings
            .slot_holder(unit.property_id, input.booking_date, input.slot_time)
            .await?
        {
            if holder.id != booking.id {
                return Err(HandoverError::Conflict(format!(
                    "{} {} is already booked",
                    input.booking_date,
                    input.slot_time.format("%H:%M")
                )));
            }
        }

        self.ctx
            .bookings
            .update_slot(id, input.booking_date, input.slot_time)
            .await
            .map_err(slot_conflict)?;
        let updated = self.booking(id).await?;

        tracing::info!(booking_id = %id, from = %booking.booking_date, to = %updated.booking_date, "Booking rescheduled");
        self.ctx
            .remark(
                unit.id,
                &caller.email,
                RemarkKind::Booking,
                format!(
                    "Handover moved from {} {} to {} {}",
                    booking.booking_date,
                    booking.slot_time.format("%H:%M"),
                    updated.booking_date,
                    updated.slot_time.format("%H:%M")
                ),
            )
            .await?;

        let property = self.ctx.property(unit.property_id).await?;
        let context = with_fields(
            Self::booking_context(&property, &unit, &updated),
            json!({
                "previous_date": booking.booking_date.format("%A %d %B %Y").to_string(),
                "previous_time": booking.slot_time.format("%H:%M").to_string(),
            }),
        );
        self.ctx
            .notify_owners(&owners, Notification::new("booking_rescheduled", context).for_unit(unit.id))
            .await;

        Ok(updated)
    }

    pub async fn cancel(&self, caller: &Caller, id: Uuid, reason: Option<String>) -> Result<Booking> {
        let booking = self.booking(id).await?;
        let (unit, owners) = self.ctx.unit_with_owners(booking.unit_id).await?;
        ensure_manage_unit(caller, &unit, &owners)?;
        if !booking.status.is_active() {
            return Err(HandoverError::Conflict(format!("booking is {}", booking.status)));
        }

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.ctx.bookings.set_status(id, BookingStatus::Cancelled, None).await?;
        if let Some(reason) = &reason {
            self.ctx.bookings.append_note(id, &format!("Cancelled: {}", reason)).await?;
        }
        tracing::info!(booking_id = %id, unit_id = %unit.id, "Booking cancelled");

        let mut body = format!(
            "Handover on {} at {} cancelled",
            booking.booking_date,
            booking.slot_time.format("%H:%M")
        );
        if let Some(reason) = &reason {
            body.push_str(&format!(": {}", reason));
        }
        self.ctx.remark(unit.id, &caller.email, RemarkKind::Booking, body).await?;
        self.ctx.refresh_handover_status(unit.id).await?;

        let property = self.ctx.property(unit.property_id).await?;
        let context = with_fields(
            Self::booking_context(&property, &unit, &booking),
            json!({ "reason": reason }),
        );
        self.ctx
            .notify_owners(&owners, Notification::new("booking_cancelled", context).for_unit(unit.id))
            .await;

        self.booking(id).await
    }

    pub async fn complete(&self, caller: &Caller, id: Uuid) -> Result<Booking> {
        require_admin(caller)?;
        let booking = self.booking(id).await?;
        if !booking.status.is_active() {
            return Err(HandoverError::Conflict(format!("booking is {}", booking.status)));
        }
        let (unit, owners) = self.ctx.unit_with_owners(booking.unit_id).await?;

        let now = Utc::now();
        self.ctx.bookings.set_status(id, BookingStatus::Completed, Some(now)).await?;
        self.ctx.units.set_handover_status(unit.id, HandoverStatus::Completed).await?;
        tracing::info!(booking_id = %id, unit_id = %unit.id, "Handover completed");

        self.ctx
            .remark(unit.id, &caller.email, RemarkKind::Booking, "Handover completed")
            .await?;

        let property = self.ctx.property(unit.property_id).await?;
        let context = with_fields(
            ServiceContext::unit_context(&property, &unit),
            json!({ "completed_at": now.format("%d %B %Y").to_string() }),
        );
        self.ctx
            .notify_owners(&owners, Notification::new("handover_completed", context).for_unit(unit.id))
            .await;

        self.booking(id).await
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<Booking> {
        let booking = self.booking(id).await?;
        let (unit, owners) = self.ctx.unit_with_owners(booking.unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        Ok(booking)
    }

    pub async fn list(&self, caller: &Caller, mut filter: BookingFilter) -> Result<Vec<Booking>> {
        match caller.role {
            Role::Admin => {}
            Role::Owner { owner_id } => filter.owner_id = Some(owner_id),
            Role::Developer { property_id } => match filter.property_id {
                Some(requested) if requested != property_id => {
                    return Err(HandoverError::forbidden("no access to this property"));
                }
                _ => filter.property_id = Some(property_id),
            },
        }
        Ok(self.ctx.bookings.list(&filter).await?)
    }

    /// Booking confirmation PDF, rendered on demand.
    pub async fn pdf(&self, caller: &Caller, id: Uuid) -> Result<(Booking, Vec<u8>)> {
        let booking = self.booking(id).await?;
        let (unit, owners) = self.ctx.unit_with_owners(booking.unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        let property = self.ctx.property(unit.property_id).await?;
        let bytes = render_confirmation(&property, &unit, &booking, &owners)?;
        Ok((booking, bytes))
    }
}

fn render_confirmation(
    property: &Property,
    unit: &Unit,
    booking: &Booking,
    owners: &[UnitOwner],
) -> Result<Vec<u8>> {
    Ok(pdf::booking_confirmation(property, unit, booking, owners)?)
}
