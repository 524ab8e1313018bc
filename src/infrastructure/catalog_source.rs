//! Catalog table downloads (gzip-compressed CSV)

use std::io::Read;

use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::CatalogTable;

use super::config::{CatalogConfig, defaults};
use super::errors::FetchError;
use super::http_client::{HttpClient, HttpClientConfig};

#[async_trait]
pub trait CatalogTableSource: Send + Sync {
    /// Compressed bytes of `table`.
    async fn download(
        &self,
        table: CatalogTable,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpCatalogSource {
    http: HttpClient,
    config: CatalogConfig,
}

impl HttpCatalogSource {
    pub fn new(config: CatalogConfig) -> Result<Self, FetchError> {
        let http = HttpClient::new(HttpClientConfig {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: config.request_timeout_seconds,
            max_requests_per_second: 1,
        })?;
        Ok(Self { http, config })
    }

    fn table_url(&self, table: CatalogTable) -> &str {
        match table {
            CatalogTable::Sets => &self.config.sets_url,
            CatalogTable::Themes => &self.config.themes_url,
        }
    }
}

/// `url?<millis>=` so intermediary caches never serve a stale table.
pub fn cache_busted(url: &str, millis: i64) -> String {
    format!("{url}?{millis}=")
}

#[async_trait]
impl CatalogTableSource for HttpCatalogSource {
    async fn download(
        &self,
        table: CatalogTable,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let url = cache_busted(self.table_url(table), Utc::now().timestamp_millis());
        info!("Downloading {} table from {}", table, self.table_url(table));
        self.http.get_bytes(&url, cancellation_token).await
    }
}

/// Inflates a gzip body into UTF-8 text.
pub fn decompress_table(compressed: &[u8]) -> std::io::Result<String> {
    let mut text = String::new();
    GzDecoder::new(compressed).read_to_string(&mut text)?;
    Ok(text)
}

/// Parses CSV text with a header row into typed rows.
pub fn parse_table<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
        .deserialize()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SetRow, ThemeRow};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decompresses_and_parses_sets() {
        let csv_text = "set_num,name,year,theme_id,num_parts,img_url\n\
                        10305-1,\"Lion Knights' Castle, Deluxe\",2022,186,4514,https://cdn.example/10305.jpg\n\
                        0011-2,Town Mini-Figures,1979,67,12,\n";

        let text = decompress_table(&gzip(csv_text)).unwrap();
        let rows: Vec<SetRow> = parse_table(&text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Lion Knights' Castle, Deluxe");
        assert_eq!(rows[0].theme_id, "186");
        assert_eq!(rows[1].img_url, "");
    }

    #[test]
    fn parses_themes() {
        let rows: Vec<ThemeRow> = parse_table("id,name,parent_id\n186,Castle,\n67,Town,\n").unwrap();
        assert_eq!(rows[1], ThemeRow { id: "67".into(), name: "Town".into() });
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        assert!(decompress_table(b"definitely not gzip").is_err());
    }

    #[test]
    fn appends_cache_buster() {
        assert_eq!(
            cache_busted("https://cdn.example/sets.csv.gz", 1700000000000),
            "https://cdn.example/sets.csv.gz?1700000000000="
        );
    }
}
