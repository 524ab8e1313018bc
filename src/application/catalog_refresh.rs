//! Catalog refresh: download both tables, build the index, replace the snapshot
//!
//! Any failure (download, decompression, parsing, storage) aborts the
//! refresh before the write, leaving the previous catalog in place.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::{CatalogIndex, CatalogTable, OperationProgress, ProgressSink, SetRow, ThemeRow};
use crate::infrastructure::catalog_source::{CatalogTableSource, decompress_table, parse_table};
use crate::infrastructure::errors::{FetchError, StorageError};
use crate::infrastructure::snapshot_repository::SnapshotRepository;

#[derive(Error, Debug)]
pub enum CatalogRefreshError {
    #[error("Failed to download {table} table: {source}")]
    Download {
        table: CatalogTable,
        #[source]
        source: FetchError,
    },

    #[error("Failed to decompress {table} table: {source}")]
    Decompress {
        table: CatalogTable,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {table} table: {source}")]
    Parse {
        table: CatalogTable,
        #[source]
        source: csv::Error,
    },

    #[error("Catalog refresh cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct CatalogRefresher {
    source: Arc<dyn CatalogTableSource>,
    repository: SnapshotRepository,
}

impl CatalogRefresher {
    pub fn new(source: Arc<dyn CatalogTableSource>, repository: SnapshotRepository) -> Self {
        Self { source, repository }
    }

    /// Rebuilds and stores the catalog; returns the new index.
    pub async fn refresh(
        &self,
        progress: &dyn ProgressSink,
        cancellation_token: &CancellationToken,
    ) -> Result<CatalogIndex, CatalogRefreshError> {
        let sets_text = self
            .download_text(CatalogTable::Sets, progress, cancellation_token)
            .await?;
        let themes_text = self
            .download_text(CatalogTable::Themes, progress, cancellation_token)
            .await?;

        progress.report(OperationProgress::ParsingTables);
        let sets: Vec<SetRow> = parse_rows(CatalogTable::Sets, &sets_text)?;
        let themes: Vec<ThemeRow> = parse_rows(CatalogTable::Themes, &themes_text)?;

        progress.report(OperationProgress::BuildingCatalog);
        let catalog = CatalogIndex::build(&sets, &themes);

        if cancellation_token.is_cancelled() {
            return Err(CatalogRefreshError::Cancelled);
        }

        self.repository.replace_catalog(&catalog, Utc::now()).await?;
        progress.report(OperationProgress::CatalogSaved {
            entries: catalog.len(),
        });
        info!(
            "Catalog replaced: {} entries from {} set rows and {} themes",
            catalog.len(),
            sets.len(),
            themes.len()
        );
        Ok(catalog)
    }

    async fn download_text(
        &self,
        table: CatalogTable,
        progress: &dyn ProgressSink,
        cancellation_token: &CancellationToken,
    ) -> Result<String, CatalogRefreshError> {
        progress.report(OperationProgress::Downloading { table });

        let compressed = self
            .source
            .download(table, cancellation_token)
            .await
            .map_err(|source| {
                if source.is_cancelled() {
                    CatalogRefreshError::Cancelled
                } else {
                    CatalogRefreshError::Download { table, source }
                }
            })?;

        decompress_table(&compressed)
            .map_err(|source| CatalogRefreshError::Decompress { table, source })
    }
}

fn parse_rows<T: DeserializeOwned>(
    table: CatalogTable,
    text: &str,
) -> Result<Vec<T>, CatalogRefreshError> {
    parse_table(text).map_err(|source| CatalogRefreshError::Parse { table, source })
}
