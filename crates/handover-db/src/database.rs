//! Database connection and schema management.
//!
//! Provides a unified handle over the SQLite pool.

use crate::error::Result;
use crate::schema;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    url: String,
}

/// Row counts reported on the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub properties: i64,
    pub units: i64,
    pub owners: i64,
    pub active_bookings: i64,
    pub remarks: i64,
    pub attachments: i64,
    pub emails_logged: i64,
}

impl Database {
    /// Open or create a database at the specified URL.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::info!(url = %url, "Opened database");
        Ok(Self { pool, url: url.to_string() })
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool, url: "sqlite::memory:".to_string() })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create all tables and indexes if they don't exist.
    pub async fn initialize(&self) -> Result<()> {
        for statement in schema::SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!(statements = schema::SCHEMA.len(), "Database schema ready");
        Ok(())
    }

    async fn count(&self, table: &str, filter: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} {}", table, filter);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            properties: self.count(schema::TABLE_PROPERTIES, "").await?,
            units: self.count(schema::TABLE_UNITS, "").await?,
            owners: self.count(schema::TABLE_OWNERS, "").await?,
            active_bookings: self
                .count(schema::TABLE_BOOKINGS, "WHERE status = 'confirmed'")
                .await?,
            remarks: self.count(schema::TABLE_REMARKS, "").await?,
            attachments: self.count(schema::TABLE_ATTACHMENTS, "").await?,
            emails_logged: self.count(schema::TABLE_EMAIL_LOGS, "").await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        tokio_test::assert_ok!(db.initialize().await);
        tokio_test::assert_ok!(db.initialize().await);

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.properties, 0);
        assert_eq!(stats.active_bookings, 0);
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("handover.db").display());
        let db = Database::open(&url, 2).await.unwrap();
        db.initialize().await.unwrap();
        assert!(dir.path().join("handover.db").exists());
        assert_eq!(db.url(), url);
    }
}
