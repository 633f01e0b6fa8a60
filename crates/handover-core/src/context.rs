//! Shared service state: configuration, repositories, file store, notifier.

use crate::access::AdminAllowlist;
use crate::eligibility;
use crate::slots::SlotGrid;
use chrono::{NaiveDate, Utc};
use handover_common::{HandoverError, HandoverStatus, RemarkKind, Result};
use handover_config::Config;
use handover_db::{
    AttachmentRepository, BookingRepository, Database, EmailLogRepository, FileStore,
    FinanceRepository, MagicLinkRepository, OwnerRepository, Property, PropertyRepository,
    Remark, RemarkRepository, Unit, UnitOwner, UnitRepository,
};
use handover_notify::{Delivery, Mailer, Notification, Notifier};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub struct ServiceContext {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    pub files: FileStore,
    pub notifier: Notifier,
    pub admins: AdminAllowlist,
    pub grid: SlotGrid,

    pub properties: PropertyRepository,
    pub units: UnitRepository,
    pub owners: OwnerRepository,
    pub bookings: BookingRepository,
    pub remarks: RemarkRepository,
    pub attachments: AttachmentRepository,
    pub finance: FinanceRepository,
    pub links: MagicLinkRepository,
    pub email_logs: EmailLogRepository,
}

impl ServiceContext {
    pub fn new(config: Arc<Config>, db: Arc<Database>, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let grid = SlotGrid::from_config(&config.booking)
            .map_err(|e| HandoverError::Config(e.to_string()))?;
        let email_logs = EmailLogRepository::new(db.clone());
        let notifier = Notifier::new(mailer, email_logs.clone())?;

        Ok(Self {
            files: FileStore::new(config.storage.root.clone()),
            admins: AdminAllowlist::new(&config.auth.admin_emails),
            grid,
            notifier,
            properties: PropertyRepository::new(db.clone()),
            units: UnitRepository::new(db.clone()),
            owners: OwnerRepository::new(db.clone()),
            bookings: BookingRepository::new(db.clone()),
            remarks: RemarkRepository::new(db.clone()),
            attachments: AttachmentRepository::new(db.clone()),
            finance: FinanceRepository::new(db.clone()),
            links: MagicLinkRepository::new(db.clone()),
            email_logs,
            db,
            config,
        })
    }

    /// Booking windows are counted in UTC calendar days.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn property(&self, id: Uuid) -> Result<Property> {
        self.properties
            .find_by_id(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("property {}", id)))
    }

    pub async fn unit(&self, id: Uuid) -> Result<Unit> {
        self.units
            .find_by_id(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("unit {}", id)))
    }

    pub async fn unit_with_owners(&self, id: Uuid) -> Result<(Unit, Vec<UnitOwner>)> {
        let unit = self.unit(id).await?;
        let owners = self.units.owners(id).await?;
        Ok((unit, owners))
    }

    pub async fn remark(
        &self,
        unit_id: Uuid,
        author: &str,
        kind: RemarkKind,
        body: impl Into<String>,
    ) -> Result<Remark> {
        let remark = Remark::new(unit_id, author, kind, body.into());
        self.remarks.insert(&remark).await?;
        Ok(remark)
    }

    /// Recompute and store the unit's handover status.
    pub async fn refresh_handover_status(&self, unit_id: Uuid) -> Result<HandoverStatus> {
        let (unit, owners) = self.unit_with_owners(unit_id).await?;
        let active = self.bookings.active_for_unit(unit_id).await?.is_some();
        let status = eligibility::derive_status(unit.handover_status, &owners, active);
        if status != unit.handover_status {
            self.units.set_handover_status(unit_id, status).await?;
            tracing::debug!(unit_id = %unit_id, from = %unit.handover_status, to = %status, "Handover status changed");
        }
        Ok(status)
    }

    /// Template context shared by every unit notification.
    pub fn unit_context(property: &Property, unit: &Unit) -> Value {
        json!({
            "property_name": property.name,
            "developer_name": property.developer_name,
            "unit_number": unit.unit_number,
        })
    }

    pub async fn notify_owners(&self, owners: &[UnitOwner], notification: Notification) -> Delivery {
        let recipients: Vec<String> = owners.iter().map(|o| o.email.clone()).collect();
        self.notifier.notify(&recipients, &notification).await
    }
}

/// Merge extra fields into a JSON object context.
pub fn with_fields(mut base: Value, extra: Value) -> Value {
    if let (Some(base_map), Value::Object(extra_map)) = (base.as_object_mut(), extra) {
        base_map.extend(extra_map);
    }
    base
}
