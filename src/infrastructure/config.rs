//! Configuration infrastructure
//!
//! Settings live in one JSON file under the user config directory. A
//! missing file is created with defaults; a file that no longer parses is
//! backed up next to itself and replaced with defaults.

#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

/// Default values shared by the config structs
pub mod defaults {
    pub const APP_DIR_NAME: &str = "brick-enricher";
    pub const CONFIG_FILE_NAME: &str = "brick_enricher_config.json";
    pub const DATABASE_FILE_NAME: &str = "brick_enricher.db";

    pub const REGISTRY_BASE_URL: &str = "https://rebrickable.com";
    pub const DAILY_LIMIT: u32 = 900;
    pub const CACHE_TTL_DAYS: i64 = 30;
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAYS_MS: [u64; 3] = [0, 2_000, 60_000];
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 15;
    pub const REGISTRY_MAX_REQUESTS_PER_SECOND: u32 = 5;

    pub const LISTING_BASE_URL: &str = "https://marstoy.com";
    pub const LISTING_COLLECTION_PATH: &str = "/collections/brick-kits";
    pub const LISTING_PAGE_PARAM: &str = "page_num";
    pub const LISTING_MAX_PAGES: u32 = 200;
    pub const LISTING_MAX_REQUESTS_PER_SECOND: u32 = 4;

    pub const CATALOG_SETS_URL: &str = "https://cdn.rebrickable.com/media/downloads/sets.csv.gz";
    pub const CATALOG_THEMES_URL: &str = "https://cdn.rebrickable.com/media/downloads/themes.csv.gz";
    pub const CATALOG_REQUEST_TIMEOUT_SECONDS: u64 = 120;

    pub const USER_AGENT: &str = "brick-enricher/0.1 (+https://github.com/brick-enricher)";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_FILE_NAME: &str = "brick-enricher.log";
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub listing: ListingConfig,
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Remote set registry used by the enrichment resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,

    /// Local, advisory cap on remote lookups per UTC calendar day
    pub daily_limit: u32,

    pub cache_ttl_days: i64,

    /// Attempts per key within one process session
    pub max_attempts: u32,

    /// Delay before attempt N+1, indexed by failures so far (last entry repeats)
    pub retry_delays_ms: Vec<u64>,

    pub request_timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub user_agent: String,
}

/// Paginated store listing walked by the collector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub base_url: String,
    pub collection_path: String,
    pub page_param: String,

    /// Hard ceiling so a listing that never returns an empty page still ends
    pub max_pages: u32,

    pub request_timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub user_agent: String,
}

/// Catalog table downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub sets_url: String,
    pub themes_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; defaults to the app data directory when unset
    pub database_path: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    pub log_file_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::REGISTRY_BASE_URL.to_string(),
            daily_limit: defaults::DAILY_LIMIT,
            cache_ttl_days: defaults::CACHE_TTL_DAYS,
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_delays_ms: defaults::RETRY_DELAYS_MS.to_vec(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::REGISTRY_MAX_REQUESTS_PER_SECOND,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache_ttl_days)
    }

    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LISTING_BASE_URL.to_string(),
            collection_path: defaults::LISTING_COLLECTION_PATH.to_string(),
            page_param: defaults::LISTING_PAGE_PARAM.to_string(),
            max_pages: defaults::LISTING_MAX_PAGES,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::LISTING_MAX_REQUESTS_PER_SECOND,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl ListingConfig {
    pub fn page_url(&self, page: u32) -> String {
        format!(
            "{}{}?{}={}",
            self.base_url.trim_end_matches('/'),
            self.collection_path,
            self.page_param,
            page
        )
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sets_url: defaults::CATALOG_SETS_URL.to_string(),
            themes_url: defaults::CATALOG_THEMES_URL.to_string(),
            request_timeout_seconds: defaults::CATALOG_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("⚠️  Configuration file could not be parsed: {}", parse_error);
                self.reset_corrupted_config().await
            }
        }
    }

    async fn reset_corrupted_config(&self) -> Result<AppConfig> {
        let backup_path = self.config_path.with_extension("json.corrupted");
        if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
            warn!("Failed to create backup of corrupted config: {}", e);
        } else {
            info!("Backed up corrupted config to: {:?}", backup_path);
        }

        let default_config = AppConfig::default();
        self.save_config(&default_config)
            .await
            .context("Failed to save default configuration")?;

        info!("✅ Reset to default configuration");
        Ok(default_config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl AppConfig {
    /// Database file to open: the configured path or the app data default
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigManager::get_app_data_dir()?.join(defaults::DATABASE_FILE_NAME)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_default_config_when_missing() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join("nested").join("config.json"));

        let config = manager.load_config().await?;

        assert!(manager.config_path().exists());
        assert_eq!(config.registry.daily_limit, defaults::DAILY_LIMIT);
        assert_eq!(config.registry.retry_delays_ms, vec![0, 2_000, 60_000]);
        assert_eq!(config.listing.max_pages, 200);
        Ok(())
    }

    #[tokio::test]
    async fn partial_config_is_completed_with_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "registry": { "daily_limit": 2 } }"#)?;

        let config = ConfigManager::with_path(&path).load_config().await?;

        assert_eq!(config.registry.daily_limit, 2);
        assert_eq!(config.registry.max_attempts, defaults::MAX_ATTEMPTS);
        assert_eq!(config.listing.page_param, "page_num");
        Ok(())
    }

    #[tokio::test]
    async fn corrupted_config_is_backed_up_and_reset() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json")?;

        let config = ConfigManager::with_path(&path).load_config().await?;

        assert_eq!(config.registry.daily_limit, defaults::DAILY_LIMIT);
        assert!(path.with_extension("json.corrupted").exists());
        Ok(())
    }

    #[test]
    fn builds_listing_page_urls() {
        let listing = ListingConfig {
            base_url: "https://shop.example/".into(),
            ..ListingConfig::default()
        };
        assert_eq!(
            listing.page_url(3),
            "https://shop.example/collections/brick-kits?page_num=3"
        );
    }
}
