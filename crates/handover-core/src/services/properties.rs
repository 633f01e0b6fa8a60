use crate::access::require_admin;
use crate::context::ServiceContext;
use chrono::{NaiveDate, Utc};
use handover_common::{Caller, HandoverError, Result, Role};
use handover_db::{DatabaseStats, Property};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewProperty {
    pub name: String,
    pub developer_name: String,
    pub location: Option<String>,
    pub handover_start: Option<NaiveDate>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyUpdate {
    pub name: Option<String>,
    pub developer_name: Option<String>,
    pub location: Option<String>,
    pub handover_start: Option<NaiveDate>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(HandoverError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct PropertyService {
    ctx: Arc<ServiceContext>,
}

impl PropertyService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, caller: &Caller, input: NewProperty) -> Result<Property> {
        require_admin(caller)?;
        let property = Property {
            id: Uuid::new_v4(),
            name: required("name", &input.name)?,
            developer_name: required("developer_name", &input.developer_name)?,
            location: input.location.filter(|l| !l.trim().is_empty()),
            handover_start: input.handover_start,
            created_at: Utc::now(),
        };
        self.ctx.properties.insert(&property).await?;
        tracing::info!(property_id = %property.id, name = %property.name, "Property created");
        Ok(property)
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<Property>> {
        match caller.role {
            Role::Admin => Ok(self.ctx.properties.list().await?),
            Role::Owner { owner_id } => Ok(self.ctx.properties.list_for_owner(owner_id).await?),
            Role::Developer { property_id } => {
                Ok(self.ctx.properties.find_by_id(property_id).await?.into_iter().collect())
            }
        }
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<Property> {
        let property = self.ctx.property(id).await?;
        let visible = match caller.role {
            Role::Admin => true,
            Role::Developer { property_id } => property_id == id,
            Role::Owner { owner_id } => !self.ctx.units.list_for_owner(id, owner_id).await?.is_empty(),
        };
        if !visible {
            return Err(HandoverError::forbidden(format!("no access to property {}", id)));
        }
        Ok(property)
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, update: PropertyUpdate) -> Result<Property> {
        require_admin(caller)?;
        let mut property = self.ctx.property(id).await?;
        if let Some(name) = update.name {
            property.name = required("name", &name)?;
        }
        if let Some(developer_name) = update.developer_name {
            property.developer_name = required("developer_name", &developer_name)?;
        }
        if let Some(location) = update.location {
            property.location = Some(location).filter(|l| !l.trim().is_empty());
        }
        if update.handover_start.is_some() {
            property.handover_start = update.handover_start;
        }
        self.ctx.properties.update(&property).await?;
        Ok(property)
    }

    /// Delete an empty property.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> Result<()> {
        require_admin(caller)?;
        self.ctx.property(id).await?;
        let units = self.ctx.units.count_by_property(id).await?;
        if units > 0 {
            return Err(HandoverError::Conflict(format!("property still has {} units", units)));
        }
        self.ctx.properties.delete(id).await?;
        tracing::info!(property_id = %id, "Property deleted");
        Ok(())
    }

    /// Row counts for the admin dashboard.
    pub async fn stats(&self, caller: &Caller) -> Result<DatabaseStats> {
        require_admin(caller)?;
        Ok(self.ctx.db.stats().await?)
    }
}
