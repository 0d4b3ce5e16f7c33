//! Media fetcher implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::MediaFetcher,
};
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry schedule for transient HTTP failures (5xx, 429, connect errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from `base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Reqwest-based media fetcher.
///
/// Keys are absolute URLs, or paths resolved against an optional base URL.
/// Any non-2xx status is an error; 404 maps to [`BridgeError::NotFound`].
pub struct ReqwestMediaFetcher {
    client: Client,
    base_url: Option<Url>,
    retry: RetryPolicy,
}

impl ReqwestMediaFetcher {
    /// Create a fetcher with default timeouts and retry policy.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("tonescan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Resolve relative keys against `base_url`. A trailing slash makes the
    /// base a directory.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid base URL {}: {}", base_url, e))
        })?;
        let mut fetcher = Self::new()?;
        fetcher.base_url = Some(base);
        Ok(fetcher)
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Absolute URL for `key`.
    pub fn resolve(&self, key: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(key) {
            return Ok(url);
        }
        match &self.base_url {
            Some(base) => base.join(key).map_err(|e| {
                BridgeError::OperationFailed(format!("Cannot resolve {} against {}: {}", key, base, e))
            }),
            None => Err(BridgeError::OperationFailed(format!(
                "Relative media key {} needs a base URL",
                key
            ))),
        }
    }

    fn is_retryable(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }
}

#[async_trait]
impl MediaFetcher for ReqwestMediaFetcher {
    async fn fetch(&self, key: &str) -> Result<Bytes> {
        let url = self.resolve(key)?;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.retry.max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = self.retry.max_attempts,
                host = url.host_str().unwrap_or_default(),
                path = url.path(),
                "Fetching media"
            );

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
                        debug!(bytes = body.len(), "Media fetched");
                        return Ok(body);
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Err(BridgeError::NotFound(url.path().to_string()));
                    }
                    if !Self::is_retryable(status) {
                        return Err(BridgeError::OperationFailed(format!("HTTP {}", status)));
                    }
                    warn!(%status, attempt = attempt + 1, "Media fetch failed with retryable status");
                    last_error = Some(BridgeError::OperationFailed(format!("HTTP {}", status)));
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "Media fetch failed");
                    last_error = Some(if e.is_timeout() {
                        BridgeError::OperationFailed("Request timed out".to_string())
                    } else if e.is_connect() {
                        BridgeError::OperationFailed(format!("Connection failed: {}", e))
                    } else {
                        BridgeError::OperationFailed(e.to_string())
                    });
                }
            }

            attempt += 1;
            if attempt < self.retry.max_attempts {
                let delay = self.retry.delay_for(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}
