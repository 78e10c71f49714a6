//! PostgreSQL implementation of the catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Catalog, CatalogEntry, CatalogError, NewEntry};

/// PostgreSQL-backed catalog.
///
/// Hash uniqueness is enforced by the UNIQUE constraint on `content_hash`;
/// an insert that loses a race surfaces as [`CatalogError::DuplicateHash`]
/// via the database's unique-violation error.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct EntryRow {
    id: Uuid,
    owner_id: Uuid,
    content_hash: String,
    fingerprint: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for CatalogEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            content_hash: row.content_hash,
            fingerprint: row.fingerprint,
            created_at: row.created_at,
        }
    }
}

impl PostgresCatalog {
    /// Connect to the database at `database_url`.
    ///
    /// Runs migrations automatically on connection.
    pub async fn new(database_url: &str) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| CatalogError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CatalogError::Migration(e.to_string()))?;

        tracing::info!("Catalog connected and migrations applied");

        Ok(Self { pool })
    }

    /// Connect using the `DATABASE_URL` environment variable.
    pub async fn from_env() -> Result<Self, CatalogError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| CatalogError::Connection("DATABASE_URL is not set".into()))?;
        Self::new(&url).await
    }

    /// Create a catalog from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn find_by_hash(
        &self,
        content_hash: &str,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, content_hash, fingerprint, created_at
            FROM artworks
            WHERE content_hash = $1
            "#,
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn corpus(&self, cap: usize) -> Result<Vec<CatalogEntry>, CatalogError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, content_hash, fingerprint, created_at
            FROM artworks
            WHERE fingerprint IS NOT NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(cap as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, entry: NewEntry) -> Result<CatalogEntry, CatalogError> {
        let row: EntryRow = sqlx::query_as(
            r#"
            INSERT INTO artworks (owner_id, content_hash, fingerprint)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, content_hash, fingerprint, created_at
            "#,
        )
        .bind(entry.owner_id)
        .bind(&entry.content_hash)
        .bind(&entry.fingerprint)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(content_hash = %row.content_hash, "Catalog entry inserted");

        Ok(row.into())
    }

    async fn remove(&self, content_hash: &str) -> Result<bool, CatalogError> {
        let result = sqlx::query("DELETE FROM artworks WHERE content_hash = $1")
            .bind(content_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, CatalogError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artworks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
