//! Paginated collection synchronizer
//!
//! Walks the store listing from page 1 until a page yields no items (or the
//! page ceiling is hit), enriches every item from the catalog and replaces
//! the persisted collection snapshot in one write. Nothing is persisted
//! unless the whole walk succeeds.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    CatalogIndex, CollectionItem, CollectionSnapshot, OperationProgress, ProgressSink,
    derive_catalog_id,
};
use crate::infrastructure::errors::{FetchError, StorageError};
use crate::infrastructure::listing_parser::{ListingCandidate, PageParser};
use crate::infrastructure::listing_source::ListingSource;
use crate::infrastructure::snapshot_repository::SnapshotRepository;

#[derive(Error, Debug)]
pub enum CollectionSyncError {
    #[error("Failed to fetch listing page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error("Collection sync cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct PaginatedCollector {
    source: Arc<dyn ListingSource>,
    parser: Arc<dyn PageParser>,
    repository: SnapshotRepository,
    max_pages: u32,
}

impl PaginatedCollector {
    pub fn new(
        source: Arc<dyn ListingSource>,
        parser: Arc<dyn PageParser>,
        repository: SnapshotRepository,
        max_pages: u32,
    ) -> Self {
        Self {
            source,
            parser,
            repository,
            max_pages,
        }
    }

    /// Full sync: walk, enrich against the stored catalog, replace the snapshot.
    pub async fn sync(
        &self,
        progress: &dyn ProgressSink,
        cancellation_token: &CancellationToken,
    ) -> Result<CollectionSnapshot, CollectionSyncError> {
        progress.report(OperationProgress::SyncStarted);

        let catalog = self.repository.load_catalog().await?;
        if catalog.is_empty() {
            warn!("Catalog is empty; items keep their scraped names");
        }

        let items = self.collect(&catalog, progress, cancellation_token).await?;
        let snapshot = CollectionSnapshot {
            items,
            synced_at: Some(Utc::now()),
        };

        self.repository.replace_collection(&snapshot).await?;
        progress.report(OperationProgress::CollectionSaved {
            items: snapshot.len(),
        });
        info!("Collection snapshot replaced ({} items)", snapshot.len());
        Ok(snapshot)
    }

    /// Walks the listing and returns the enriched items in page order.
    pub async fn collect(
        &self,
        catalog: &CatalogIndex,
        progress: &dyn ProgressSink,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<CollectionItem>, CollectionSyncError> {
        let mut collected = Vec::new();

        for page in 1..=self.max_pages {
            if cancellation_token.is_cancelled() {
                return Err(CollectionSyncError::Cancelled);
            }
            progress.report(OperationProgress::PageStarted { page });

            let body = match self.source.fetch_page(page, cancellation_token).await {
                Ok(body) => body,
                Err(e) if e.is_cancelled() => return Err(CollectionSyncError::Cancelled),
                Err(source) => return Err(CollectionSyncError::Fetch { page, source }),
            };

            let candidates = body
                .map(|raw| dedupe_by_url(self.parser.parse(&raw)))
                .unwrap_or_default();

            if candidates.is_empty() {
                debug!("Page {} is empty; listing exhausted", page);
                progress.report(OperationProgress::ListingExhausted {
                    last_page: page - 1,
                });
                return Ok(collected);
            }

            progress.report(OperationProgress::PageCollected {
                page,
                items: candidates.len(),
            });
            collected.extend(candidates.into_iter().map(|c| enrich(c, catalog)));
        }

        warn!("Stopped after the {}-page ceiling", self.max_pages);
        progress.report(OperationProgress::ListingExhausted {
            last_page: self.max_pages,
        });
        Ok(collected)
    }
}

/// Keeps the first candidate per link, in page order.
fn dedupe_by_url(candidates: Vec<ListingCandidate>) -> Vec<ListingCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.url.clone()))
        .collect()
}

/// Catalog name, year and theme win over what the page showed.
fn enrich(candidate: ListingCandidate, catalog: &CatalogIndex) -> CollectionItem {
    let catalog_id = if candidate.store_id.is_empty() {
        String::new()
    } else {
        derive_catalog_id(&candidate.store_id)
    };

    match catalog.lookup(&catalog_id) {
        Some(entry) => CollectionItem {
            name: if entry.name.is_empty() {
                candidate.name
            } else {
                entry.name.clone()
            },
            year: entry.year,
            theme_name: entry.theme_name.clone(),
            catalog_id,
            store_id: candidate.store_id,
            url: candidate.url,
        },
        None => CollectionItem {
            catalog_id,
            store_id: candidate.store_id,
            name: candidate.name,
            year: None,
            theme_name: String::new(),
            url: candidate.url,
        },
    }
}
