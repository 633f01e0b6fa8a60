//! Unit repository, including the unit↔owner links.
//!
//! Payment and document state live on the link rows. The `set_*` writers
//! update every co-owner of a unit in a single statement so the rows never
//! disagree after a write.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{Unit, UnitOwner};
use chrono::Utc;
use handover_common::{DocumentsStatus, HandoverStatus, PaymentStatus};
use std::sync::Arc;
use uuid::Uuid;

const UNIT_OWNER_SELECT: &str = "
    SELECT uo.unit_id, uo.owner_id, o.name, o.email, o.phone,
           uo.is_primary, uo.payment_status, uo.documents_status, uo.linked_at
    FROM unit_owners uo
    JOIN owners o ON o.id = uo.owner_id";

/// Repository for unit operations.
#[derive(Clone)]
pub struct UnitRepository {
    db: Arc<Database>,
}

/// New link row for [`UnitRepository::link_owner`].
#[derive(Debug, Clone)]
pub struct NewLink {
    pub unit_id: Uuid,
    pub owner_id: Uuid,
    pub is_primary: bool,
    pub payment_status: PaymentStatus,
    pub documents_status: DocumentsStatus,
}

impl UnitRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ── Units ────────────────────────────────────────────────────────────────

    pub async fn insert(&self, unit: &Unit) -> Result<()> {
        sqlx::query(
            "INSERT INTO units (id, property_id, unit_number, unit_type, floor, area_sqft,
                                handover_status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(unit.id)
        .bind(unit.property_id)
        .bind(&unit.unit_number)
        .bind(&unit.unit_type)
        .bind(unit.floor)
        .bind(unit.area_sqft)
        .bind(unit.handover_status)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Unit>> {
        let unit = sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(unit)
    }

    pub async fn list_by_property(&self, property_id: Uuid) -> Result<Vec<Unit>> {
        let rows = sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE property_id = ? ORDER BY unit_number",
        )
        .bind(property_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Units of a property that the owner is linked to.
    pub async fn list_for_owner(&self, property_id: Uuid, owner_id: Uuid) -> Result<Vec<Unit>> {
        let rows = sqlx::query_as::<_, Unit>(
            "SELECT u.* FROM units u
             JOIN unit_owners uo ON uo.unit_id = u.id
             WHERE u.property_id = ? AND uo.owner_id = ?
             ORDER BY u.unit_number",
        )
        .bind(property_id)
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn count_by_property(&self, property_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM units WHERE property_id = ?")
            .bind(property_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Update the descriptive fields of a unit. Status is written separately.
    pub async fn update(&self, unit: &Unit) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE units SET unit_number = ?, unit_type = ?, floor = ?, area_sqft = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&unit.unit_number)
        .bind(&unit.unit_type)
        .bind(unit.floor)
        .bind(unit.area_sqft)
        .bind(Utc::now())
        .bind(unit.id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_handover_status(&self, id: Uuid, status: HandoverStatus) -> Result<()> {
        sqlx::query("UPDATE units SET handover_status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    // ── Owner links ──────────────────────────────────────────────────────────

    /// Co-owners of a unit, primary first, then in link order.
    pub async fn owners(&self, unit_id: Uuid) -> Result<Vec<UnitOwner>> {
        let sql = format!(
            "{} WHERE uo.unit_id = ? ORDER BY uo.is_primary DESC, uo.linked_at, o.email",
            UNIT_OWNER_SELECT
        );
        let rows = sqlx::query_as::<_, UnitOwner>(&sql)
            .bind(unit_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    pub async fn owner_link(&self, unit_id: Uuid, owner_id: Uuid) -> Result<Option<UnitOwner>> {
        let sql = format!("{} WHERE uo.unit_id = ? AND uo.owner_id = ?", UNIT_OWNER_SELECT);
        let row = sqlx::query_as::<_, UnitOwner>(&sql)
            .bind(unit_id)
            .bind(owner_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    /// Link an owner to a unit. When the new link is primary, any existing
    /// primary of the unit is demoted in the same transaction.
    pub async fn link_owner(&self, link: &NewLink) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        if link.is_primary {
            sqlx::query("UPDATE unit_owners SET is_primary = 0 WHERE unit_id = ?")
                .bind(link.unit_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO unit_owners (unit_id, owner_id, is_primary, payment_status,
                                      documents_status, linked_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(link.unit_id)
        .bind(link.owner_id)
        .bind(link.is_primary)
        .bind(link.payment_status)
        .bind(link.documents_status)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove an owner link. If it was the primary, the earliest-linked
    /// remaining co-owner is promoted. Returns the promoted owner, if any.
    pub async fn unlink_owner(&self, unit_id: Uuid, owner_id: Uuid) -> Result<Option<Uuid>> {
        let mut tx = self.db.pool().begin().await?;

        let was_primary: Option<bool> = sqlx::query_scalar(
            "SELECT is_primary FROM unit_owners WHERE unit_id = ? AND owner_id = ?",
        )
        .bind(unit_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(was_primary) = was_primary else {
            return Err(DbError::NotFound(format!("owner {} on unit {}", owner_id, unit_id)));
        };

        sqlx::query("DELETE FROM unit_owners WHERE unit_id = ? AND owner_id = ?")
            .bind(unit_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        let mut promoted = None;
        if was_primary {
            promoted = sqlx::query_scalar::<_, Uuid>(
                "SELECT owner_id FROM unit_owners WHERE unit_id = ?
                 ORDER BY linked_at, owner_id LIMIT 1",
            )
            .bind(unit_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(next) = promoted {
                sqlx::query("UPDATE unit_owners SET is_primary = 1 WHERE unit_id = ? AND owner_id = ?")
                    .bind(unit_id)
                    .bind(next)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(promoted)
    }

    /// Write the payment status to every co-owner of the unit.
    pub async fn set_payment_status(&self, unit_id: Uuid, status: PaymentStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE unit_owners SET payment_status = ? WHERE unit_id = ?")
            .bind(status)
            .bind(unit_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Write the documents status to every co-owner of the unit.
    pub async fn set_documents_status(&self, unit_id: Uuid, status: DocumentsStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE unit_owners SET documents_status = ? WHERE unit_id = ?")
            .bind(status)
            .bind(unit_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Write both states to every co-owner of the unit.
    pub async fn set_shared_state(
        &self,
        unit_id: Uuid,
        payment: PaymentStatus,
        documents: DocumentsStatus,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE unit_owners SET payment_status = ?, documents_status = ? WHERE unit_id = ?",
        )
        .bind(payment)
        .bind(documents)
        .bind(unit_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
