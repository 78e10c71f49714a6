//! Pipeline configuration
//!
//! Handles loading tunables from environment variables with sensible defaults.

use std::time::Duration;

/// Default ceiling on fetched remote content (5 MiB).
pub const DEFAULT_MAX_FETCH_BYTES: u64 = 5 * 1024 * 1024;

/// Default bound on followed redirect hops.
pub const DEFAULT_MAX_REDIRECTS: u32 = 3;

/// Default wall-clock limit for a complete remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default Hamming-distance threshold for near-duplicate classification.
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 8;

/// Default cap on catalog entries considered per near-duplicate scan.
pub const DEFAULT_CORPUS_CAP: usize = 2000;

/// Tunables for the duplicate-detection pipeline.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Maximum accepted remote content size in bytes (default: 5 MiB)
    pub max_fetch_bytes: u64,
    /// Maximum redirect hops followed before failing (default: 3)
    pub max_redirects: u32,
    /// Wall-clock timeout covering the entire fetch, all hops included
    /// (default: 10 s)
    pub fetch_timeout: Duration,
    /// Maximum Hamming distance still classified as a near duplicate
    /// (default: 8)
    pub similarity_threshold: u32,
    /// Maximum number of fingerprinted entries scanned per near-duplicate
    /// check (default: 2000)
    pub corpus_cap: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_fetch_bytes: DEFAULT_MAX_FETCH_BYTES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            corpus_cap: DEFAULT_CORPUS_CAP,
        }
    }
}

impl GuardConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let max_fetch_bytes = std::env::var("DUPGUARD_MAX_FETCH_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_FETCH_BYTES);

        let max_redirects = std::env::var("DUPGUARD_MAX_REDIRECTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_REDIRECTS);

        let fetch_timeout = std::env::var("DUPGUARD_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT);

        let similarity_threshold = std::env::var("DUPGUARD_SIMILARITY_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);

        let corpus_cap = std::env::var("DUPGUARD_CORPUS_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CORPUS_CAP);

        Self {
            max_fetch_bytes,
            max_redirects,
            fetch_timeout,
            similarity_threshold,
            corpus_cap,
        }
    }
}
