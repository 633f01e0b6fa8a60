//! Owner repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::Owner;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for owner operations.
#[derive(Clone)]
pub struct OwnerRepository {
    db: Arc<Database>,
}

impl OwnerRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, owner: &Owner) -> Result<()> {
        sqlx::query("INSERT INTO owners (id, name, email, phone, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(owner.id)
            .bind(&owner.name)
            .bind(&owner.email)
            .bind(&owner.phone)
            .bind(owner.created_at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(owner)
    }

    /// Find an owner by email (trimmed, case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(owner)
    }

    pub async fn update_contact(&self, id: Uuid, name: &str, phone: Option<&str>) -> Result<bool> {
        let result = sqlx::query("UPDATE owners SET name = ?, phone = ? WHERE id = ?")
            .bind(name)
            .bind(phone)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Owner>> {
        let rows = sqlx::query_as::<_, Owner>("SELECT * FROM owners ORDER BY email LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }
}
