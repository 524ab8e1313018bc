//! Paginated listing fetches

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::ListingConfig;
use super::errors::FetchError;
use super::http_client::{HttpClient, HttpClientConfig};

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Raw body of page `page`.
    ///
    /// `Ok(None)` for a non-success status (the collector reads that as the
    /// end of the listing); `Err` for transport failures and cancellation.
    async fn fetch_page(
        &self,
        page: u32,
        cancellation_token: &CancellationToken,
    ) -> Result<Option<String>, FetchError>;
}

pub struct HttpListingSource {
    http: HttpClient,
    config: ListingConfig,
}

impl HttpListingSource {
    pub fn new(config: ListingConfig) -> Result<Self, FetchError> {
        let http = HttpClient::new(HttpClientConfig {
            user_agent: config.user_agent.clone(),
            timeout_seconds: config.request_timeout_seconds,
            max_requests_per_second: config.max_requests_per_second,
        })?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(
        &self,
        page: u32,
        cancellation_token: &CancellationToken,
    ) -> Result<Option<String>, FetchError> {
        let url = self.config.page_url(page);
        match self.http.get_text(&url, &[], cancellation_token).await {
            Ok(body) => Ok(Some(body)),
            Err(FetchError::Status { status, .. }) => {
                debug!("Listing page {} answered {}; treating as end of listing", page, status);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
