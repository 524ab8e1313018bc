//! Application state shared by every command
//!
//! Built once per process: opens the database, loads the credential, wires
//! the remote collaborators and constructs the resolver session. Tests use
//! `assemble` with in-memory storage and scripted collaborators.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::OperationKind;
use crate::infrastructure::catalog_source::{CatalogTableSource, HttpCatalogSource};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::errors::FetchError;
use crate::infrastructure::key_value_store::{SqliteKeyValueStore, Storage};
use crate::infrastructure::listing_parser::{MarkupPageParser, PageParser};
use crate::infrastructure::listing_source::{HttpListingSource, ListingSource};
use crate::infrastructure::quota_tracker::QuotaTracker;
use crate::infrastructure::registry_client::{RebrickableClient, SetLookup};
use crate::infrastructure::snapshot_repository::SnapshotRepository;
use crate::infrastructure::status_broadcaster::StatusBroadcaster;
use crate::infrastructure::timed_cache::TimedCache;

use super::catalog_refresh::CatalogRefresher;
use super::collection_sync::PaginatedCollector;
use super::enrichment_resolver::EnrichmentResolver;
use super::resolver_session::ResolverSession;

/// Remote-facing capabilities the core flows depend on
pub struct RemoteCollaborators {
    pub registry: Arc<dyn SetLookup>,
    pub listing: Arc<dyn ListingSource>,
    pub parser: Arc<dyn PageParser>,
    pub catalog: Arc<dyn CatalogTableSource>,
}

impl RemoteCollaborators {
    /// Real HTTP implementations configured from `config`.
    pub fn http(config: &AppConfig) -> Result<Self, FetchError> {
        Ok(Self {
            registry: Arc::new(RebrickableClient::new(&config.registry)?),
            listing: Arc::new(HttpListingSource::new(config.listing.clone())?),
            parser: Arc::new(MarkupPageParser::new(&config.listing.base_url)),
            catalog: Arc::new(HttpCatalogSource::new(config.catalog.clone())?),
        })
    }
}

/// Commands that may only run one at a time
#[derive(Default)]
pub struct ActiveOperations {
    running: Arc<Mutex<HashSet<OperationKind>>>,
}

impl ActiveOperations {
    /// `None` when `kind` is already running.
    pub fn try_begin(&self, kind: OperationKind) -> Option<ActiveOperation> {
        let mut running = self.running.lock().ok()?;
        if !running.insert(kind) {
            return None;
        }
        Some(ActiveOperation {
            running: Arc::clone(&self.running),
            kind,
        })
    }

    pub fn is_running(&self, kind: OperationKind) -> bool {
        self.running
            .lock()
            .map(|running| running.contains(&kind))
            .unwrap_or(false)
    }
}

/// Marks an operation as running until dropped.
pub struct ActiveOperation {
    running: Arc<Mutex<HashSet<OperationKind>>>,
    kind: OperationKind,
}

impl Drop for ActiveOperation {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.kind);
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub snapshots: SnapshotRepository,
    pub credentials: Arc<CredentialStore>,
    pub resolver: EnrichmentResolver,
    pub collector: Arc<PaginatedCollector>,
    pub refresher: Arc<CatalogRefresher>,
    pub broadcaster: StatusBroadcaster,
    pub operations: ActiveOperations,
}

impl AppState {
    /// Opens the configured SQLite database and wires the HTTP collaborators.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let database_path = config.database_path()?;
        let database = DatabaseConnection::open_path(&database_path)
            .await
            .with_context(|| format!("Failed to open database at {}", database_path.display()))?;
        database.migrate().await.context("Failed to prepare database schema")?;
        info!("Using database {}", database_path.display());

        let storage = Storage::new(Arc::new(SqliteKeyValueStore::new(database.pool().clone())));
        let credentials = CredentialStore::load(storage.clone())
            .await
            .context("Failed to load registry credential")?;
        let remote = RemoteCollaborators::http(&config).context("Failed to build HTTP clients")?;

        Ok(Self::assemble(config, storage, credentials, remote))
    }

    pub fn assemble(
        config: AppConfig,
        storage: Storage,
        credentials: CredentialStore,
        remote: RemoteCollaborators,
    ) -> Self {
        let snapshots = SnapshotRepository::new(storage.clone());
        let credentials = Arc::new(credentials);

        let session = Arc::new(ResolverSession::new(
            config.registry.max_attempts,
            config.registry.retry_delays(),
        ));
        let resolver = EnrichmentResolver::new(
            TimedCache::new(storage.clone(), config.registry.cache_ttl()),
            Arc::new(QuotaTracker::new(storage, config.registry.daily_limit)),
            Arc::clone(&credentials),
            remote.registry,
            session,
        );

        let collector = Arc::new(PaginatedCollector::new(
            remote.listing,
            remote.parser,
            snapshots.clone(),
            config.listing.max_pages,
        ));
        let refresher = Arc::new(CatalogRefresher::new(remote.catalog, snapshots.clone()));

        Self {
            config,
            snapshots,
            credentials,
            resolver,
            collector,
            refresher,
            broadcaster: StatusBroadcaster::new(),
            operations: ActiveOperations::default(),
        }
    }

    /// Aborts outstanding resolver work (backoff waits, registry requests).
    pub fn shutdown(&self) {
        self.resolver.session().shutdown();
    }
}
