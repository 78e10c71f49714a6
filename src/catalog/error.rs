//! Error types for the catalog module.

use thiserror::Error;

/// Errors that can occur when interacting with the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An entry with the same content hash already exists.
    ///
    /// The one conflict the guard handles specially: it marks a lost
    /// insert race and is folded into an exact-duplicate verdict instead
    /// of surfacing as a failure.
    #[error("An entry with this content hash already exists")]
    DuplicateHash,

    /// Database connection failed
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Query execution failed
    #[error("Query error: {0}")]
    Query(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::DuplicateHash;
            }
        }
        Self::Query(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for CatalogError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}
