//! Bounded remote image retrieval.
//!
//! Downloads a caller-supplied URL under three hard limits: a byte ceiling
//! enforced while the body streams in, a redirect hop cap, and a wall clock
//! covering the entire transfer. Automatic redirect following is disabled on
//! the client so both the hop bound and the terminal status stay observable
//! here. Nothing is written to persistent storage; an aborted transfer
//! leaves no partial state behind.

use std::time::{Duration, Instant};

use reqwest::{header, redirect, Client, Response};
use tracing::{debug, warn};
use url::Url;

use crate::config::GuardConfig;
use crate::error::FetchError;

/// Streaming downloader for remote image sources.
pub struct RemoteFetcher {
    client: Client,
    max_bytes: u64,
    max_redirects: u32,
    timeout: Duration,
}

impl RemoteFetcher {
    /// Create a fetcher enforcing the limits in `config`.
    pub fn new(config: &GuardConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_bytes: config.max_fetch_bytes,
            max_redirects: config.max_redirects,
            timeout: config.fetch_timeout,
        })
    }

    /// Download `url` and return the body bytes.
    ///
    /// The wall-clock limit spans the whole transfer, redirect hops
    /// included, so a stalled chain fails the same way a stalled body does.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let target = parse_image_url(url)?;

        match tokio::time::timeout(self.timeout, self.fetch_inner(target)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url, timeout_ms = self.timeout.as_millis() as u64, "Fetch timed out");
                Err(FetchError::Timeout {
                    after: self.timeout,
                })
            }
        }
    }

    async fn fetch_inner(&self, mut target: Url) -> Result<Vec<u8>, FetchError> {
        let start = Instant::now();
        let mut hops = 0u32;

        let mut response = loop {
            let response = self.client.get(target.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                hops += 1;
                if hops > self.max_redirects {
                    warn!(url = %target, hops, "Redirect chain exceeded limit");
                    return Err(FetchError::TooManyRedirects {
                        limit: self.max_redirects,
                    });
                }
                target = redirect_target(&target, &response)?;
                debug!(url = %target, hop = hops, "Following redirect");
                continue;
            }

            if !status.is_success() {
                warn!(url = %target, status = %status, "Remote returned error status");
                return Err(FetchError::HttpStatus { status });
            }

            break response;
        };

        // A declared length over the limit is rejected before streaming;
        // the streamed count below remains authoritative either way.
        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                warn!(url = %target, content_length = length, "Declared content length over limit");
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() as u64 + chunk.len() as u64 > self.max_bytes {
                warn!(
                    url = %target,
                    received = body.len() + chunk.len(),
                    "Stream exceeded byte limit, aborting"
                );
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(
            url = %target,
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Fetch completed"
        );
        Ok(body)
    }
}

/// Parse and validate a fetch URL. Only `http` and `https` are accepted.
fn parse_image_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!(
            "unsupported scheme: {other}"
        ))),
    }
}

/// Resolve the Location header of a redirect response against the current
/// URL. A redirect without a usable Location is treated as a terminal
/// HTTP-status failure.
fn redirect_target(current: &Url, response: &Response) -> Result<Url, FetchError> {
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(FetchError::HttpStatus {
            status: response.status(),
        })?;

    current
        .join(location)
        .map_err(|e| FetchError::InvalidUrl(format!("{location}: {e}")))
}
