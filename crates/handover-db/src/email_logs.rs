//! Outbound email log repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::EmailLog;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct EmailLogRepository {
    db: Arc<Database>,
}

impl EmailLogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, log: &EmailLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO email_logs (id, recipient, subject, template, status, error, unit_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.id)
        .bind(&log.recipient)
        .bind(&log.subject)
        .bind(&log.template)
        .bind(log.status)
        .bind(&log.error)
        .bind(log.unit_id)
        .bind(log.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Most recent entries first, optionally for a single unit.
    pub async fn list(&self, unit_id: Option<Uuid>, limit: i64) -> Result<Vec<EmailLog>> {
        let rows = match unit_id {
            Some(unit_id) => {
                sqlx::query_as::<_, EmailLog>(
                    "SELECT * FROM email_logs WHERE unit_id = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(unit_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, EmailLog>("SELECT * FROM email_logs ORDER BY created_at DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };
        Ok(rows)
    }
}
