//! Co-owner links and the shared payment / documents state.
//!
//! Every write of the shared state goes to all co-owner rows at once.
//! Rows can still disagree when they were edited outside this service;
//! `repair_sync` rewrites them to the least-advanced state.

use crate::access::{ensure_view_unit, is_valid_email, normalize_email, require_admin};
use crate::context::{with_fields, ServiceContext};
use crate::eligibility::{least_advanced, SyncState};
use handover_common::{
    Caller, DocumentsStatus, HandoverError, PaymentStatus, RemarkKind, Result,
};
use handover_db::{NewLink, Owner, UnitOwner};
use handover_notify::Notification;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct AttachOwner {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Clone)]
pub struct OwnershipService {
    ctx: Arc<ServiceContext>,
}

impl OwnershipService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn owners(&self, caller: &Caller, unit_id: Uuid) -> Result<Vec<UnitOwner>> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        Ok(owners)
    }

    /// Link an owner to a unit, creating the owner record when the email is
    /// new. The newcomer inherits the unit's current shared state.
    pub async fn attach_owner(
        &self,
        caller: &Caller,
        unit_id: Uuid,
        input: AttachOwner,
    ) -> Result<Vec<UnitOwner>> {
        require_admin(caller)?;
        let (unit, existing) = self.ctx.unit_with_owners(unit_id).await?;

        let email = normalize_email(&input.email);
        if !is_valid_email(&email) {
            return Err(HandoverError::Validation(format!("'{}' is not an email address", input.email)));
        }

        let owner = match self.ctx.owners.find_by_email(&email).await? {
            Some(owner) => owner,
            None => {
                let name = input
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        HandoverError::Validation("name is required for a new owner".to_string())
                    })?;
                let mut owner = Owner::new(name.to_string(), &email);
                owner.phone = input.phone.clone().filter(|p| !p.trim().is_empty());
                self.ctx.owners.insert(&owner).await?;
                tracing::info!(owner_id = %owner.id, email = %owner.email, "Owner created");
                owner
            }
        };

        if existing.iter().any(|o| o.owner_id == owner.id) {
            return Err(HandoverError::Conflict(format!(
                "{} is already an owner of unit {}",
                owner.email, unit.unit_number
            )));
        }

        let (payment_status, documents_status) = least_advanced(&existing)
            .unwrap_or((PaymentStatus::Pending, DocumentsStatus::Missing));
        let is_primary = input.is_primary || existing.is_empty();

        self.ctx
            .units
            .link_owner(&NewLink {
                unit_id,
                owner_id: owner.id,
                is_primary,
                payment_status,
                documents_status,
            })
            .await?;

        self.ctx
            .remark(
                unit_id,
                &caller.email,
                RemarkKind::Ownership,
                format!(
                    "{} linked as {}owner",
                    owner.email,
                    if is_primary { "primary " } else { "co-" }
                ),
            )
            .await?;
        self.ctx.refresh_handover_status(unit_id).await?;

        Ok(self.ctx.units.owners(unit_id).await?)
    }

    /// Unlink an owner. The earliest-linked co-owner takes over as primary.
    pub async fn detach_owner(&self, caller: &Caller, unit_id: Uuid, owner_id: Uuid) -> Result<Vec<UnitOwner>> {
        require_admin(caller)?;
        let (_, owners) = self.ctx.unit_with_owners(unit_id).await?;
        let link = owners
            .iter()
            .find(|o| o.owner_id == owner_id)
            .ok_or_else(|| HandoverError::not_found(format!("owner {} on unit {}", owner_id, unit_id)))?;

        if let Some(booking) = self.ctx.bookings.active_for_unit(unit_id).await? {
            if booking.owner_id == owner_id {
                return Err(HandoverError::Conflict(
                    "owner holds the unit's active booking; cancel it first".to_string(),
                ));
            }
        }

        let promoted = self.ctx.units.unlink_owner(unit_id, owner_id).await?;
        let mut body = format!("{} unlinked", link.email);
        if let Some(next) = promoted.and_then(|id| owners.iter().find(|o| o.owner_id == id)) {
            body.push_str(&format!("; {} is now primary", next.email));
        }
        self.ctx.remark(unit_id, &caller.email, RemarkKind::Ownership, body).await?;
        self.ctx.refresh_handover_status(unit_id).await?;

        Ok(self.ctx.units.owners(unit_id).await?)
    }

    pub async fn set_payment_status(
        &self,
        caller: &Caller,
        unit_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Vec<UnitOwner>> {
        require_admin(caller)?;
        self.write_payment(&caller.email, unit_id, status).await
    }

    /// Write the payment status to every co-owner, record it and tell them.
    pub(crate) async fn write_payment(
        &self,
        author: &str,
        unit_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Vec<UnitOwner>> {
        let (unit, _) = self.ctx.unit_with_owners(unit_id).await?;
        let property = self.ctx.property(unit.property_id).await?;

        let written = self.ctx.units.set_payment_status(unit_id, status).await?;
        if written == 0 {
            return Err(HandoverError::Validation(format!(
                "unit {} has no owners",
                unit.unit_number
            )));
        }
        tracing::info!(unit_id = %unit_id, status = %status, owners = written, "Payment status updated");

        self.ctx
            .remark(unit_id, author, RemarkKind::Payment, format!("Payment status set to {}", status))
            .await?;
        self.ctx.refresh_handover_status(unit_id).await?;

        let owners = self.ctx.units.owners(unit_id).await?;
        let context = with_fields(
            ServiceContext::unit_context(&property, &unit),
            json!({ "status": status.as_str() }),
        );
        self.ctx
            .notify_owners(&owners, Notification::new("payment_status", context).for_unit(unit_id))
            .await;
        Ok(owners)
    }

    pub async fn set_documents_status(
        &self,
        caller: &Caller,
        unit_id: Uuid,
        status: DocumentsStatus,
        note: Option<String>,
    ) -> Result<Vec<UnitOwner>> {
        require_admin(caller)?;
        self.write_documents(&caller.email, unit_id, status, note, true).await
    }

    /// Write the documents status to every co-owner and record it.
    pub(crate) async fn write_documents(
        &self,
        author: &str,
        unit_id: Uuid,
        status: DocumentsStatus,
        note: Option<String>,
        notify: bool,
    ) -> Result<Vec<UnitOwner>> {
        let (unit, _) = self.ctx.unit_with_owners(unit_id).await?;

        let written = self.ctx.units.set_documents_status(unit_id, status).await?;
        if written == 0 {
            return Err(HandoverError::Validation(format!(
                "unit {} has no owners",
                unit.unit_number
            )));
        }
        tracing::info!(unit_id = %unit_id, status = %status, owners = written, "Documents status updated");

        let mut body = format!("Documents status set to {}", status);
        if let Some(note) = note.as_deref().filter(|n| !n.trim().is_empty()) {
            body.push_str(&format!(": {}", note.trim()));
        }
        self.ctx.remark(unit_id, author, RemarkKind::Documents, body).await?;
        self.ctx.refresh_handover_status(unit_id).await?;

        let owners = self.ctx.units.owners(unit_id).await?;
        if notify {
            let property = self.ctx.property(unit.property_id).await?;
            let context = with_fields(
                ServiceContext::unit_context(&property, &unit),
                json!({ "status": status.as_str(), "note": note }),
            );
            self.ctx
                .notify_owners(&owners, Notification::new("documents_status", context).for_unit(unit_id))
                .await;
        }
        Ok(owners)
    }

    pub async fn sync_state(&self, caller: &Caller, unit_id: Uuid) -> Result<SyncState> {
        let owners = self.owners(caller, unit_id).await?;
        Ok(SyncState::of(&owners))
    }

    /// Rewrite diverged co-owner rows to the least-advanced state found.
    pub async fn repair_sync(&self, caller: &Caller, unit_id: Uuid) -> Result<SyncState> {
        require_admin(caller)?;
        let (_, owners) = self.ctx.unit_with_owners(unit_id).await?;

        let state = SyncState::of(&owners);
        let SyncState::Diverged { payment, documents } = state else {
            return Ok(state);
        };

        self.ctx.units.set_shared_state(unit_id, payment, documents).await?;
        tracing::warn!(unit_id = %unit_id, payment = %payment, documents = %documents, "Repaired diverged co-owner state");
        self.ctx
            .remark(
                unit_id,
                &caller.email,
                RemarkKind::Ownership,
                format!("Co-owner state realigned to payment {}, documents {}", payment, documents),
            )
            .await?;
        self.ctx.refresh_handover_status(unit_id).await?;

        Ok(SyncState::Consistent { payment, documents })
    }
}
