//! Remote set registry lookup
//!
//! `GET {base}/api/v3/lego/sets/{catalog_id}-1/` authenticated with
//! `Authorization: key <credential>`. The resolver only depends on the
//! `SetLookup` trait so tests can count and script remote calls.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::RegistryConfig;
use super::errors::FetchError;
use super::http_client::{HttpClient, HttpClientConfig};

/// Registry payload; only the fields the enrichment uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistrySet {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub set_num: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<u16>,
    #[serde(default)]
    pub set_img_url: Option<String>,
}

impl RegistrySet {
    /// Trimmed name when present and non-blank.
    pub fn usable_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Accepts `2022`, `"2022"`, `null` or garbage (as `None`).
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|y| u16::try_from(y).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[async_trait]
pub trait SetLookup: Send + Sync {
    /// Fetches the registry record for `catalog_id`.
    async fn fetch_set(
        &self,
        catalog_id: &str,
        credential: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<RegistrySet, FetchError>;
}

pub struct RebrickableClient {
    http: HttpClient,
    base_url: String,
}

impl RebrickableClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, FetchError> {
        let http = HttpClient::new(HttpClientConfig {
            user_agent: config.user_agent.clone(),
            timeout_seconds: config.request_timeout_seconds,
            max_requests_per_second: config.max_requests_per_second,
        })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn set_url(&self, catalog_id: &str) -> String {
        format!("{}/api/v3/lego/sets/{}-1/", self.base_url, catalog_id)
    }
}

#[async_trait]
impl SetLookup for RebrickableClient {
    async fn fetch_set(
        &self,
        catalog_id: &str,
        credential: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<RegistrySet, FetchError> {
        let url = self.set_url(catalog_id);
        let headers = [
            (ACCEPT, "application/json".to_string()),
            (AUTHORIZATION, format!("key {credential}")),
        ];

        let body = self.http.get_text(&url, &headers, cancellation_token).await?;
        let set: RegistrySet = serde_json::from_str(&body).map_err(|e| FetchError::InvalidBody {
            url: url.clone(),
            message: e.to_string(),
        })?;

        debug!("Registry answered {} with set_num {:?}", url, set.set_num);
        Ok(set)
    }
}
