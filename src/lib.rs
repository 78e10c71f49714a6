//! Dupguard - duplicate detection core for artwork catalogs
//!
//! This crate decides, before an uploaded image is published, whether it is
//! an exact re-encoding of an image the catalog already holds or a visually
//! near-identical variant of one. Surrounding application concerns
//! (routing, sessions, CRUD bookkeeping) stay outside; the caller supplies
//! an uploader identity and bytes or a URL, and receives a single verdict.
//!
//! # Features
//!
//! - Encoding-invariant content hashing: SHA3-256 over canonical RGB pixels
//!   plus dimensions, stable across JPEG/PNG/WEBP re-encodes
//! - 64-bit perceptual fingerprints (difference hash) for near-duplicate
//!   detection within a configurable Hamming-distance threshold
//! - Bounded remote fetching: streamed size cap, redirect hop cap, and a
//!   wall clock over the whole transfer
//! - Exact-duplicate exclusion made race-safe by the catalog's uniqueness
//!   constraint; a lost insert race is reported as a duplicate, not an error
//! - Pluggable catalog storage: in-memory for tests and development,
//!   PostgreSQL behind the `postgres` feature
//!
//! # Example
//!
//! ```no_run
//! use dupguard::{DuplicateGuard, GuardConfig, ImageSource, MemoryCatalog, Verdict};
//! use uuid::Uuid;
//!
//! # async fn example() -> dupguard::Result<()> {
//! let guard = DuplicateGuard::new(MemoryCatalog::new(), GuardConfig::default())?;
//!
//! let bytes = std::fs::read("artwork.png").unwrap();
//! match guard.screen(ImageSource::Upload(bytes), Uuid::new_v4()).await? {
//!     Verdict::Unique { content_hash, .. } => println!("published as {content_hash}"),
//!     Verdict::ExactDuplicate { owner_id } => println!("already published by {owner_id}"),
//!     Verdict::NearDuplicate { distance, .. } => println!("too similar ({distance} bits away)"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod guard;
pub mod normalize;
pub mod similarity;
pub mod staging;

// Re-export main types for convenience
pub use catalog::{Catalog, CatalogEntry, CatalogError, MemoryCatalog, NewEntry};
pub use config::GuardConfig;
pub use error::{DedupError, FetchError, Result};
pub use fetch::RemoteFetcher;
pub use fingerprint::{fingerprint, fingerprint_image, Fingerprint};
pub use guard::{DuplicateGuard, ImageSource, Verdict};
pub use normalize::{content_hash, ContentHash, DecodedRaster};
pub use similarity::{distance, is_similar, NOT_COMPARABLE};
pub use staging::StagedUpload;

#[cfg(feature = "postgres")]
pub use catalog::PostgresCatalog;
