//! Manifest download over HTTP(S).

use std::time::Duration;

use async_trait::async_trait;
use provenance_core::{DownloadError, ManifestStorage};
use reqwest::Client as HttpClient;
use tracing::{debug, warn};
use url::Url;

use crate::validate::DEFAULT_MAX_MANIFEST_BYTES;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry configuration for failed downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Never retry
    #[must_use]
    pub const fn none() -> Self {
        Self::new().max_retries(0)
    }

    #[must_use]
    pub const fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    #[must_use]
    pub const fn initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    #[must_use]
    pub const fn max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Backoff before retry number `attempt` (zero-based), doubling each
    /// time and capped at `max_backoff`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |backoff| backoff.min(self.max_backoff))
    }
}

/// [`ManifestStorage`] that fetches manifests from HTTP(S) URLs, such as
/// public or presigned object-storage links.
///
/// Bodies larger than `max_bytes` are abandoned mid-transfer.
#[derive(Debug, Clone)]
pub struct HttpManifestStorage {
    http: HttpClient,
    timeout: Duration,
    retry: RetryConfig,
    max_bytes: usize,
}

impl HttpManifestStorage {
    /// Build a client with the given per-request timeout and retry policy.
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self, DownloadError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("provenance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::Connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            timeout,
            retry,
            max_bytes: DEFAULT_MAX_MANIFEST_BYTES,
        })
    }

    /// Refuse bodies larger than `max_bytes`.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn download_once(&self, url: &Url) -> Result<Vec<u8>, DownloadError> {
        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }

        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX);
        let declared = response.content_length();
        if declared.is_some_and(|len| len > limit) {
            debug!(url = %url, declared, limit, "refusing oversized manifest");
            return Err(self.too_large());
        }

        let capacity = declared
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let mut body = Vec::with_capacity(capacity);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.body_error(&e))?
        {
            if body.len().saturating_add(chunk.len()) > self.max_bytes {
                debug!(url = %url, limit, "manifest body over limit");
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    const fn too_large(&self) -> DownloadError {
        DownloadError::TooLarge {
            limit: self.max_bytes,
        }
    }

    fn body_error(&self, err: &reqwest::Error) -> DownloadError {
        if err.is_timeout() {
            DownloadError::Timeout(self.timeout)
        } else {
            DownloadError::Body(err.to_string())
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> DownloadError {
        if err.is_timeout() {
            DownloadError::Timeout(self.timeout)
        } else {
            DownloadError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl ManifestStorage for HttpManifestStorage {
    async fn download(&self, uri: &str) -> Result<Vec<u8>, DownloadError> {
        let url = Url::parse(uri).map_err(|e| DownloadError::InvalidUri(format!("{uri}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidUri(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }

        let mut attempt = 0;
        loop {
            match self.download_once(&url).await {
                Ok(bytes) => {
                    debug!(uri, bytes = bytes.len(), "downloaded manifest");
                    return Ok(bytes);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let backoff = self.retry.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        uri,
                        error = %e,
                        retry = attempt,
                        max_retries = self.retry.max_retries,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "retrying manifest download"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
