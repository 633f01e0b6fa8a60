//! Property repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::Property;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for property operations.
#[derive(Clone)]
pub struct PropertyRepository {
    db: Arc<Database>,
}

impl PropertyRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, property: &Property) -> Result<()> {
        sqlx::query(
            "INSERT INTO properties (id, name, developer_name, location, handover_start, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(property.id)
        .bind(&property.name)
        .bind(&property.developer_name)
        .bind(&property.location)
        .bind(property.handover_start)
        .bind(property.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>> {
        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(property)
    }

    pub async fn list(&self) -> Result<Vec<Property>> {
        let rows = sqlx::query_as::<_, Property>("SELECT * FROM properties ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Properties where the owner holds at least one unit.
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Property>> {
        let rows = sqlx::query_as::<_, Property>(
            "SELECT DISTINCT p.* FROM properties p
             JOIN units u ON u.property_id = p.id
             JOIN unit_owners uo ON uo.unit_id = u.id
             WHERE uo.owner_id = ?
             ORDER BY p.name",
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Update a property. Returns false when no row matched.
    pub async fn update(&self, property: &Property) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE properties SET name = ?, developer_name = ?, location = ?, handover_start = ?
             WHERE id = ?",
        )
        .bind(&property.name)
        .bind(&property.developer_name)
        .bind(&property.location)
        .bind(property.handover_start)
        .bind(property.id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
