//! Infrastructure layer: persistence, remote fetches, configuration and logging
//!
//! Everything here performs I/O on behalf of the application layer. Remote
//! collaborators sit behind small traits (`SetLookup`, `ListingSource`,
//! `CatalogTableSource`, `PageParser`, `KeyValueStore`) so the core flows can
//! be exercised with scripted fakes.

pub mod catalog_source;
pub mod config;
pub mod credential_store;
pub mod database_connection;
pub mod errors;
pub mod http_client;
pub mod key_value_store;
pub mod listing_parser;
pub mod listing_source;
pub mod logging;
pub mod quota_tracker;
pub mod registry_client;
pub mod snapshot_repository;
pub mod status_broadcaster;
pub mod timed_cache;

pub use catalog_source::{CatalogTableSource, HttpCatalogSource, decompress_table, parse_table};
pub use config::{AppConfig, ConfigManager};
pub use credential_store::CredentialStore;
pub use database_connection::DatabaseConnection;
pub use errors::{FetchError, StorageError};
pub use http_client::{HttpClient, HttpClientConfig};
pub use key_value_store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, Storage, keys};
pub use listing_parser::{ListingCandidate, MarkupPageParser, PageParser};
pub use listing_source::{HttpListingSource, ListingSource};
pub use logging::{get_log_directory, init_logging_with_config};
pub use quota_tracker::QuotaTracker;
pub use registry_client::{RebrickableClient, RegistrySet, SetLookup};
pub use snapshot_repository::{SnapshotRepository, StorageStatus};
pub use status_broadcaster::{OperationReporter, StatusBroadcaster};
pub use timed_cache::TimedCache;
