//! Catalog storage for published artworks.
//!
//! The duplicate guard consumes three storage capabilities: exact lookup by
//! content hash, a bounded scan over fingerprinted entries, and an insert
//! that fails with a dedicated conflict signal when the content hash is
//! already taken. The conflict signal is what makes check-then-insert safe
//! under concurrency, so every backend must enforce hash uniqueness at
//! commit time rather than by a prior read.
//!
//! Two backends are provided: [`MemoryCatalog`] for tests and development,
//! and [`PostgresCatalog`] (behind the `postgres` feature) for production.

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::CatalogError;
pub use memory::MemoryCatalog;
#[cfg(feature = "postgres")]
pub use postgres::PostgresCatalog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published artwork's identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique record identifier
    pub id: Uuid,
    /// Identity that published the artwork
    pub owner_id: Uuid,
    /// SHA3-256 content hash (hex-encoded, unique across the catalog)
    pub content_hash: String,
    /// 64-bit perceptual fingerprint (hex-encoded), None when the image
    /// could not be fingerprinted
    pub fingerprint: Option<String>,
    /// Publication timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner_id: Uuid,
    pub content_hash: String,
    pub fingerprint: Option<String>,
}

/// Storage port consumed by the duplicate guard.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Point lookup by exact content hash.
    async fn find_by_hash(&self, content_hash: &str)
        -> Result<Option<CatalogEntry>, CatalogError>;

    /// Up to `cap` entries that carry a fingerprint, newest first.
    ///
    /// This is the candidate set for near-duplicate scans; entries beyond
    /// the cap are not considered.
    async fn corpus(&self, cap: usize) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Insert a new entry.
    ///
    /// Fails with [`CatalogError::DuplicateHash`] when an entry with the
    /// same content hash already exists. Backends must enforce this with a
    /// real uniqueness constraint so that concurrent inserts of the same
    /// hash admit exactly one winner.
    async fn insert(&self, entry: NewEntry) -> Result<CatalogEntry, CatalogError>;

    /// Remove the entry with the given content hash.
    ///
    /// Returns whether an entry was removed. Used when an artwork is
    /// deleted, freeing its hash for re-publication.
    async fn remove(&self, content_hash: &str) -> Result<bool, CatalogError>;

    /// Total number of entries.
    async fn count(&self) -> Result<i64, CatalogError>;
}
