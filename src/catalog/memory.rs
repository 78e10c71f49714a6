//! In-memory catalog backed by a concurrent map.
//!
//! Keyed by content hash; the map's entry API makes check-and-insert a
//! single atomic step, so the uniqueness guarantee holds under concurrent
//! inserts exactly like the database constraint does. Intended for tests
//! and development.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{Catalog, CatalogEntry, CatalogError, NewEntry};
use async_trait::async_trait;

/// DashMap-backed catalog. Entries are lost on drop.
#[derive(Default)]
pub struct MemoryCatalog {
    // Value carries an insertion sequence number so the corpus can be
    // served newest first without relying on timestamp resolution.
    entries: DashMap<String, (u64, CatalogEntry)>,
    seq: AtomicU64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_by_hash(
        &self,
        content_hash: &str,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self
            .entries
            .get(content_hash)
            .map(|kv| kv.value().1.clone()))
    }

    async fn corpus(&self, cap: usize) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut rows: Vec<(u64, CatalogEntry)> = self
            .entries
            .iter()
            .filter(|kv| kv.value().1.fingerprint.is_some())
            .map(|kv| kv.value().clone())
            .collect();

        rows.sort_by(|a, b| b.0.cmp(&a.0));
        rows.truncate(cap);

        Ok(rows.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn insert(&self, entry: NewEntry) -> Result<CatalogEntry, CatalogError> {
        match self.entries.entry(entry.content_hash.clone()) {
            Entry::Occupied(_) => Err(CatalogError::DuplicateHash),
            Entry::Vacant(slot) => {
                let record = CatalogEntry {
                    id: Uuid::new_v4(),
                    owner_id: entry.owner_id,
                    content_hash: entry.content_hash,
                    fingerprint: entry.fingerprint,
                    created_at: Utc::now(),
                };
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, record.clone()));
                Ok(record)
            }
        }
    }

    async fn remove(&self, content_hash: &str) -> Result<bool, CatalogError> {
        Ok(self.entries.remove(content_hash).is_some())
    }

    async fn count(&self) -> Result<i64, CatalogError> {
        Ok(self.entries.len() as i64)
    }
}
