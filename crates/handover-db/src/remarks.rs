//! Remark (unit timeline) repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::Remark;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct RemarkRepository {
    db: Arc<Database>,
}

impl RemarkRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, remark: &Remark) -> Result<()> {
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
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Timeline of a unit, newest first.
    pub async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<Remark>> {
        let rows = sqlx::query_as::<_, Remark>(
            "SELECT * FROM remarks WHERE unit_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}
