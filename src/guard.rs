//! Duplicate screening pipeline.
//!
//! Orchestrates one submission end to end: acquire the bytes, derive the
//! content hash and perceptual fingerprint, check the catalog for an exact
//! match, scan the bounded corpus for a near match, and finally insert.
//!
//! The exact check and the insert are deliberately not atomic. Instead the
//! catalog's uniqueness constraint is the commit-time exclusion point: an
//! insert that loses a race fails with the dedicated conflict signal and is
//! reported as an exact duplicate, never as an error. Near-duplicate
//! screening carries no such guarantee; two byte-distinct but similar
//! images submitted concurrently can both pass, a documented trade-off
//! against serializing every upload on a corpus scan.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogError, NewEntry};
use crate::config::GuardConfig;
use crate::error::{DedupError, Result};
use crate::fetch::RemoteFetcher;
use crate::fingerprint;
use crate::normalize::{self, DecodedRaster};
use crate::similarity;
use crate::staging::StagedUpload;

/// Where a submission's bytes come from.
#[derive(Debug)]
pub enum ImageSource {
    /// Body already in memory (direct upload).
    Upload(Vec<u8>),
    /// Body spooled to a temp file by the web layer; the file is removed
    /// as soon as the pipeline is done with it.
    Staged(StagedUpload),
    /// Remote URL to fetch under the configured limits.
    Remote(String),
}

/// Terminal decision for one screened submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No duplicate found. The submission is now in the catalog; the hashes
    /// are echoed for the caller's own bookkeeping.
    Unique {
        content_hash: String,
        fingerprint: Option<String>,
    },
    /// Decodes to exactly the pixels of an existing entry.
    ExactDuplicate { owner_id: Uuid },
    /// Within the similarity threshold of an existing entry. Carries the
    /// matched entry's hash and distance so the caller can explain the
    /// rejection and distinguish same-owner from different-owner.
    NearDuplicate {
        owner_id: Uuid,
        content_hash: String,
        distance: u32,
    },
}

impl Verdict {
    /// Whether the submission was accepted into the catalog.
    pub fn is_publishable(&self) -> bool {
        matches!(self, Verdict::Unique { .. })
    }
}

/// Screens submissions against the catalog before they are published.
pub struct DuplicateGuard<C: Catalog> {
    catalog: C,
    fetcher: RemoteFetcher,
    config: GuardConfig,
}

impl<C: Catalog> DuplicateGuard<C> {
    pub fn new(catalog: C, config: GuardConfig) -> Result<Self> {
        let fetcher = RemoteFetcher::new(&config)?;
        Ok(Self {
            catalog,
            fetcher,
            config,
        })
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Screen one submission; a unique one is entered into the catalog.
    ///
    /// Fetch and decode failures abort before any catalog access. Dropping
    /// the returned future cancels outstanding fetch I/O, and a staged
    /// source's temp file is removed on every path out of here.
    #[instrument(level = "debug", skip_all, fields(owner_id = %owner_id))]
    pub async fn screen(&self, source: ImageSource, owner_id: Uuid) -> Result<Verdict> {
        let bytes = match source {
            ImageSource::Upload(bytes) => bytes,
            ImageSource::Staged(staged) => staged.read().await?,
            ImageSource::Remote(url) => self.fetcher.fetch(&url).await?,
        };
        debug!(bytes = bytes.len(), "Submission bytes acquired");

        // CPU-bound: decode once, derive both signals off the async pool.
        let (content_hash, fp) = tokio::task::spawn_blocking(move || {
            let image = normalize::decode_oriented(&bytes)?;
            let raster = DecodedRaster::from_image(&image);
            Ok::<_, DedupError>((raster.content_hash(), fingerprint::fingerprint_image(&image)))
        })
        .await
        .map_err(|e| DedupError::Internal(format!("hashing task failed: {e}")))??;

        let content_hash = content_hash.to_hex();
        let fingerprint_hex = Some(fp.to_hex());
        debug!(content_hash = %content_hash, fingerprint = %fp, "Submission hashed");

        if let Some(existing) = self.catalog.find_by_hash(&content_hash).await? {
            info!(owner_id = %existing.owner_id, "Exact duplicate found");
            return Ok(Verdict::ExactDuplicate {
                owner_id: existing.owner_id,
            });
        }

        if let Some(query_fp) = fingerprint_hex.as_deref() {
            if let Some(verdict) = self.find_near_duplicate(query_fp).await? {
                return Ok(verdict);
            }
        }

        let new_entry = NewEntry {
            owner_id,
            content_hash: content_hash.clone(),
            fingerprint: fingerprint_hex.clone(),
        };
        match self.catalog.insert(new_entry.clone()).await {
            Ok(stored) => {
                info!(id = %stored.id, content_hash = %stored.content_hash, "Submission published as unique");
                Ok(Verdict::Unique {
                    content_hash,
                    fingerprint: fingerprint_hex,
                })
            }
            Err(CatalogError::DuplicateHash) => self.resolve_lost_race(new_entry).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Scan the bounded corpus, returning at the first entry within the
    /// similarity threshold.
    async fn find_near_duplicate(&self, query_fp: &str) -> Result<Option<Verdict>> {
        let corpus = self.catalog.corpus(self.config.corpus_cap).await?;
        debug!(candidates = corpus.len(), "Scanning corpus for near duplicates");

        for entry in corpus {
            let d = similarity::distance(Some(query_fp), entry.fingerprint.as_deref());
            if d >= 0 && d as u32 <= self.config.similarity_threshold {
                info!(
                    distance = d,
                    owner_id = %entry.owner_id,
                    "Near duplicate found"
                );
                return Ok(Some(Verdict::NearDuplicate {
                    owner_id: entry.owner_id,
                    content_hash: entry.content_hash,
                    distance: d as u32,
                }));
            }
        }

        Ok(None)
    }

    /// A concurrent submission of the same content won the insert. Report
    /// the winner as an exact duplicate; if it was already removed again,
    /// retry the insert once.
    async fn resolve_lost_race(&self, entry: NewEntry) -> Result<Verdict> {
        warn!(content_hash = %entry.content_hash, "Insert conflicted, resolving winner");

        if let Some(winner) = self.catalog.find_by_hash(&entry.content_hash).await? {
            return Ok(Verdict::ExactDuplicate {
                owner_id: winner.owner_id,
            });
        }

        let content_hash = entry.content_hash.clone();
        let fingerprint = entry.fingerprint.clone();
        match self.catalog.insert(entry).await {
            Ok(stored) => {
                info!(id = %stored.id, "Conflicting entry vanished, insert retried");
                Ok(Verdict::Unique {
                    content_hash,
                    fingerprint,
                })
            }
            Err(CatalogError::DuplicateHash) => {
                let winner = self
                    .catalog
                    .find_by_hash(&content_hash)
                    .await?
                    .ok_or_else(|| {
                        DedupError::Internal(
                            "insert keeps conflicting without a visible winner".into(),
                        )
                    })?;
                Ok(Verdict::ExactDuplicate {
                    owner_id: winner.owner_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn test_image(seed: u8) -> Vec<u8> {
        let image = RgbImage::from_fn(64, 64, |x, y| {
            Rgb([
                seed.wrapping_add((x * 3) as u8),
                seed.wrapping_add((y * 5) as u8),
                seed.wrapping_mul(2),
            ])
        });
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn guard() -> DuplicateGuard<MemoryCatalog> {
        DuplicateGuard::new(MemoryCatalog::new(), GuardConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unique_submission_is_inserted() {
        let guard = guard();
        let owner = Uuid::new_v4();

        let verdict = guard
            .screen(ImageSource::Upload(test_image(0)), owner)
            .await
            .unwrap();

        let Verdict::Unique {
            content_hash,
            fingerprint,
        } = verdict
        else {
            panic!("expected unique verdict");
        };
        assert_eq!(content_hash.len(), 64);
        assert_eq!(fingerprint.as_deref().map(str::len), Some(16));
        assert_eq!(guard.catalog().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_is_exact_duplicate() {
        let guard = guard();
        let owner = Uuid::new_v4();

        guard
            .screen(ImageSource::Upload(test_image(1)), owner)
            .await
            .unwrap();
        let verdict = guard
            .screen(ImageSource::Upload(test_image(1)), Uuid::new_v4())
            .await
            .unwrap();

        assert!(matches!(
            verdict,
            Verdict::ExactDuplicate { owner_id } if owner_id == owner
        ));
        assert_eq!(guard.catalog().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_huge_threshold_still_detects_near_matches() {
        // Thresholds above i32::MAX must not wrap the corpus-scan
        // comparison and let near matches publish
        let config = GuardConfig {
            similarity_threshold: 2_147_483_648,
            ..GuardConfig::default()
        };
        let guard = DuplicateGuard::new(MemoryCatalog::new(), config).unwrap();
        let owner = Uuid::new_v4();

        // Same gradient structure under different seeds: byte-distinct,
        // fingerprint-identical
        guard
            .screen(ImageSource::Upload(test_image(0)), owner)
            .await
            .unwrap();
        let verdict = guard
            .screen(ImageSource::Upload(test_image(5)), Uuid::new_v4())
            .await
            .unwrap();

        assert!(matches!(
            verdict,
            Verdict::NearDuplicate { owner_id, .. } if owner_id == owner
        ));
    }

    #[tokio::test]
    async fn test_undecodable_upload_is_rejected_without_insert() {
        let guard = guard();

        let err = guard
            .screen(
                ImageSource::Upload(b"not an image".to_vec()),
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DedupError::Decode(_)));
        assert_eq!(guard.catalog().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_staged_file_is_cleaned_up_on_failure() {
        let guard = guard();
        let staged = StagedUpload::from_bytes(b"not an image").unwrap();
        let path = staged.path().to_path_buf();

        let result = guard
            .screen(ImageSource::Staged(staged), Uuid::new_v4())
            .await;

        assert!(result.is_err());
        assert!(!path.exists(), "staged temp file must be removed");
    }

    #[tokio::test]
    async fn test_staged_file_is_cleaned_up_on_success() {
        let guard = guard();
        let staged = StagedUpload::from_bytes(&test_image(2)).unwrap();
        let path = staged.path().to_path_buf();

        let verdict = guard
            .screen(ImageSource::Staged(staged), Uuid::new_v4())
            .await
            .unwrap();

        assert!(verdict.is_publishable());
        assert!(!path.exists(), "staged temp file must be removed");
    }

    #[tokio::test]
    async fn test_invalid_url_is_fetch_failure() {
        let guard = guard();

        let err = guard
            .screen(
                ImageSource::Remote("not a url".to_string()),
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DedupError::Fetch(_)));
        assert_eq!(guard.catalog().count().await.unwrap(), 0);
    }
}
