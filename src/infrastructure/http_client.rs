//! Rate-limited HTTP client with cancellation support
//!
//! Every request waits on a governor token bucket, then races the send and
//! the body read against a `CancellationToken`. Non-success statuses are
//! returned as `FetchError::Status` so callers can decide how to treat them.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::defaults;
use super::errors::FetchError;

/// HTTP client configuration
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::REGISTRY_MAX_REQUESTS_PER_SECOND,
        }
    }
}

pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| FetchError::Configuration(format!("Invalid user agent: {e}")))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        let quota = Quota::per_second(NonZeroU32::new(config.max_requests_per_second).ok_or_else(
            || FetchError::Configuration("Rate limit must be greater than 0".to_string()),
        )?);

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET `url` with extra headers; fails on non-success status.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(HeaderName, String)],
        cancellation_token: &CancellationToken,
    ) -> Result<Response, FetchError> {
        if cancellation_token.is_cancelled() {
            return Err(cancelled(url));
        }

        tokio::select! {
            _ = self.rate_limiter.until_ready() => {},
            _ = cancellation_token.cancelled() => return Err(cancelled(url)),
        }

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        debug!("Fetching URL: {}", url);

        let response = tokio::select! {
            result = request.send() => result.map_err(|e| self.transport_error(url, e))?,
            _ = cancellation_token.cancelled() => {
                warn!("🛑 HTTP request cancelled for URL: {}", url);
                return Err(cancelled(url));
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("Non-success status {} from {}", status, url);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// Response body as text.
    pub async fn get_text(
        &self,
        url: &str,
        headers: &[(HeaderName, String)],
        cancellation_token: &CancellationToken,
    ) -> Result<String, FetchError> {
        let response = self.get(url, headers, cancellation_token).await?;

        let text = tokio::select! {
            result = response.text() => result.map_err(|e| self.transport_error(url, e))?,
            _ = cancellation_token.cancelled() => {
                warn!("🛑 Response reading cancelled for URL: {}", url);
                return Err(cancelled(url));
            }
        };

        debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }

    /// Response body as raw bytes (for compressed downloads).
    pub async fn get_bytes(
        &self,
        url: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url, &[], cancellation_token).await?;

        let bytes = tokio::select! {
            result = response.bytes() => result.map_err(|e| self.transport_error(url, e))?,
            _ = cancellation_token.cancelled() => return Err(cancelled(url)),
        };

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    fn transport_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.config.timeout_seconds,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

fn cancelled(url: &str) -> FetchError {
    FetchError::Cancelled {
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let client = HttpClient::new(HttpClientConfig::default()).unwrap();
        assert_eq!(
            client.config().max_requests_per_second,
            defaults::REGISTRY_MAX_REQUESTS_PER_SECOND
        );
    }

    #[test]
    fn zero_rate_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(matches!(
            HttpClient::new(config),
            Err(FetchError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let client = HttpClient::new(HttpClientConfig::default()).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .get_text("http://127.0.0.1:9/never", &[], &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
