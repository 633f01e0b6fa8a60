//! Database error types.

use handover_common::HandoverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        // Unique indexes back the booking and ownership rules
        let duplicate = err
            .as_database_error()
            .filter(|db_err| db_err.is_unique_violation())
            .map(|db_err| db_err.message().to_string());
        match duplicate {
            Some(message) => DbError::Duplicate(message),
            None => DbError::Sqlx(err),
        }
    }
}

impl From<DbError> for HandoverError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(e) => HandoverError::Database(e),
            DbError::NotFound(what) => HandoverError::NotFound(what),
            DbError::Duplicate(what) => HandoverError::Conflict(what),
            DbError::Io(e) => HandoverError::Storage(e.to_string()),
            DbError::InvalidPath(p) => HandoverError::Storage(format!("invalid path {}", p)),
            DbError::Serialization(e) => HandoverError::Serialization(e),
        }
    }
}
