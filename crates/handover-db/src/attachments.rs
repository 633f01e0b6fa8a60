//! Attachment (handover document) repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::Attachment;
use handover_common::ReviewStatus;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AttachmentRepository {
    db: Arc<Database>,
}

impl AttachmentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, attachment: &Attachment) -> Result<()> {
        sqlx::query(
            "INSERT INTO attachments (id, unit_id, owner_id, document_type, file_name, stored_path,
                                      content_type, size_bytes, review_status, reviewed_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(attachment.id)
        .bind(attachment.unit_id)
        .bind(attachment.owner_id)
        .bind(&attachment.document_type)
        .bind(&attachment.file_name)
        .bind(&attachment.stored_path)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(attachment.review_status)
        .bind(&attachment.reviewed_by)
        .bind(attachment.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Attachment>> {
        let row = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<Attachment>> {
        let rows = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE unit_id = ? ORDER BY created_at DESC",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn set_review(&self, id: Uuid, status: ReviewStatus, reviewer: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE attachments SET review_status = ?, reviewed_by = ? WHERE id = ?")
            .bind(status)
            .bind(reviewer)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Distinct document types with at least one approved attachment.
    pub async fn approved_types(&self, unit_id: Uuid) -> Result<Vec<String>> {
        let types = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT document_type FROM attachments
             WHERE unit_id = ? AND review_status = 'approved'
             ORDER BY document_type",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(types)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
