use crate::access::{ensure_view_unit, require_admin};
use crate::context::ServiceContext;
use crate::eligibility::{self, Eligibility, SyncState};
use chrono::Utc;
use handover_common::{Caller, HandoverError, HandoverStatus, Result, Role};
use handover_db::{Booking, Unit, UnitOwner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUnit {
    pub unit_number: String,
    pub unit_type: Option<String>,
    pub floor: Option<i64>,
    pub area_sqft: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitUpdate {
    pub unit_number: Option<String>,
    pub unit_type: Option<String>,
    pub floor: Option<i64>,
    pub area_sqft: Option<f64>,
}

/// A unit with everything the detail view shows.
#[derive(Debug, Clone, Serialize)]
pub struct UnitDetail {
    #[serde(flatten)]
    pub unit: Unit,
    pub owners: Vec<UnitOwner>,
    pub active_booking: Option<Booking>,
    pub sync: SyncState,
    pub eligibility: Eligibility,
}

#[derive(Clone)]
pub struct UnitService {
    ctx: Arc<ServiceContext>,
}

impl UnitService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, caller: &Caller, property_id: Uuid, input: NewUnit) -> Result<Unit> {
        require_admin(caller)?;
        self.ctx.property(property_id).await?;

        let unit_number = input.unit_number.trim();
        if unit_number.is_empty() {
            return Err(HandoverError::Validation("unit_number must not be empty".to_string()));
        }
        let mut unit = Unit::new(property_id, unit_number.to_string());
        unit.unit_type = input.unit_type;
        unit.floor = input.floor;
        unit.area_sqft = input.area_sqft;

        self.ctx.units.insert(&unit).await.map_err(|e| match HandoverError::from(e) {
            HandoverError::Conflict(_) => {
                HandoverError::Conflict(format!("unit {} already exists", unit.unit_number))
            }
            other => other,
        })?;
        tracing::info!(unit_id = %unit.id, unit_number = %unit.unit_number, "Unit created");
        Ok(unit)
    }

    pub async fn list(&self, caller: &Caller, property_id: Uuid) -> Result<Vec<Unit>> {
        self.ctx.property(property_id).await?;
        match caller.role {
            Role::Admin => Ok(self.ctx.units.list_by_property(property_id).await?),
            Role::Developer { property_id: own } if own == property_id => {
                Ok(self.ctx.units.list_by_property(property_id).await?)
            }
            Role::Developer { .. } => Err(HandoverError::forbidden("no access to this property")),
            Role::Owner { owner_id } => Ok(self.ctx.units.list_for_owner(property_id, owner_id).await?),
        }
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<UnitDetail> {
        let (unit, owners) = self.ctx.unit_with_owners(id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        self.detail(unit, owners).await
    }

    pub(crate) async fn detail(&self, unit: Unit, owners: Vec<UnitOwner>) -> Result<UnitDetail> {
        let active_booking = self.ctx.bookings.active_for_unit(unit.id).await?;
        let eligibility =
            eligibility::evaluate(&owners, active_booking.is_some(), unit.handover_status);
        Ok(UnitDetail {
            sync: SyncState::of(&owners),
            eligibility,
            active_booking,
            owners,
            unit,
        })
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, update: UnitUpdate) -> Result<Unit> {
        require_admin(caller)?;
        let mut unit = self.ctx.unit(id).await?;
        if let Some(number) = update.unit_number {
            let number = number.trim();
            if number.is_empty() {
                return Err(HandoverError::Validation("unit_number must not be empty".to_string()));
            }
            unit.unit_number = number.to_string();
        }
        if update.unit_type.is_some() {
            unit.unit_type = update.unit_type;
        }
        if update.floor.is_some() {
            unit.floor = update.floor;
        }
        if update.area_sqft.is_some() {
            unit.area_sqft = update.area_sqft;
        }
        self.ctx.units.update(&unit).await?;
        unit.updated_at = Utc::now();
        Ok(unit)
    }

    /// Recompute the stored handover status from the unit's facts.
    pub async fn refresh_status(&self, caller: &Caller, id: Uuid) -> Result<HandoverStatus> {
        require_admin(caller)?;
        self.ctx.refresh_handover_status(id).await
    }
}
