//! Sign-in link repository (owner/admin links and developer links).
//!
//! Lookups are by token digest; expiry is checked by the caller so that a
//! single clock decides.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{DeveloperMagicLink, MagicLink};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct MagicLinkRepository {
    db: Arc<Database>,
}

impl MagicLinkRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ── Owner / admin links ──────────────────────────────────────────────────

    pub async fn insert(&self, link: &MagicLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO magic_links (id, email, token_hash, expires_at, used_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(link.id)
        .bind(&link.email)
        .bind(&link.token_hash)
        .bind(link.expires_at)
        .bind(link.used_at)
        .bind(link.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<MagicLink>> {
        let row = sqlx::query_as::<_, MagicLink>("SELECT * FROM magic_links WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    /// Record first use. Later calls leave the original timestamp.
    pub async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE magic_links SET used_at = ? WHERE id = ? AND used_at IS NULL")
            .bind(at)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    // ── Developer links ──────────────────────────────────────────────────────

    pub async fn insert_developer(&self, link: &DeveloperMagicLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO developer_magic_links (id, property_id, email, token_hash, expires_at,
                                                revoked, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(link.id)
        .bind(link.property_id)
        .bind(&link.email)
        .bind(&link.token_hash)
        .bind(link.expires_at)
        .bind(link.revoked)
        .bind(link.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_developer_by_hash(&self, token_hash: &str) -> Result<Option<DeveloperMagicLink>> {
        let row = sqlx::query_as::<_, DeveloperMagicLink>(
            "SELECT * FROM developer_magic_links WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_developer_links(&self, property_id: Uuid) -> Result<Vec<DeveloperMagicLink>> {
        let rows = sqlx::query_as::<_, DeveloperMagicLink>(
            "SELECT * FROM developer_magic_links WHERE property_id = ? ORDER BY created_at DESC",
        )
        .bind(property_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn revoke_developer(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE developer_magic_links SET revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
