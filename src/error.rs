use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::catalog::CatalogError;

/// Failures while retrieving image bytes from a remote URL.
///
/// Every variant is recoverable from the caller's point of view: retry the
/// fetch, or fall back to a direct upload. None of them leave partial state
/// behind.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("fetch timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("remote content exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("remote server responded with HTTP {status}")]
    HttpStatus { status: StatusCode },

    #[error("network error: {0}")]
    Network(String),

    #[error("redirect chain exceeded {limit} hops")]
    TooManyRedirects { limit: u32 },
}

impl From<reqwest::Error> for FetchError {
    // The fetcher applies its wall-clock bound around the whole transfer,
    // so a reqwest error here is a transport failure, not a timeout.
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Top-level error type for the duplicate-detection pipeline.
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DedupError>;
