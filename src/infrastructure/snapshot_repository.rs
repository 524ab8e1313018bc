//! Catalog and collection snapshots
//!
//! Each snapshot is stored together with its timestamp in one `put_many`,
//! so a reader sees either the previous pair or the new pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CatalogEntry, CatalogIndex, CollectionItem, CollectionSnapshot};

use super::errors::StorageError;
use super::key_value_store::{Storage, keys, to_value};

/// Timestamps and sizes of the persisted snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    pub catalog_entries: usize,
    pub catalog_last_updated: Option<DateTime<Utc>>,
    pub collection_items: usize,
    pub collection_last_sync: Option<DateTime<Utc>>,
    pub initial_sync_done: bool,
    pub credential_configured: bool,
}

#[derive(Clone)]
pub struct SnapshotRepository {
    storage: Storage,
}

impl SnapshotRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    // ===============================
    // CATALOG
    // ===============================

    /// Persisted catalog, empty when none was ever built.
    pub async fn load_catalog(&self) -> Result<CatalogIndex, StorageError> {
        Ok(self
            .storage
            .get_json(keys::CATALOG_ENTRIES)
            .await?
            .unwrap_or_default())
    }

    pub async fn lookup_catalog_entry(
        &self,
        catalog_id: &str,
    ) -> Result<Option<CatalogEntry>, StorageError> {
        Ok(self.load_catalog().await?.lookup(catalog_id).cloned())
    }

    pub async fn replace_catalog(
        &self,
        catalog: &CatalogIndex,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.storage
            .put_many(vec![
                (
                    keys::CATALOG_ENTRIES.to_string(),
                    to_value(keys::CATALOG_ENTRIES, catalog)?,
                ),
                (
                    keys::CATALOG_LAST_UPDATED.to_string(),
                    to_value(keys::CATALOG_LAST_UPDATED, &updated_at)?,
                ),
            ])
            .await
    }

    pub async fn catalog_last_updated(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.storage.get_json(keys::CATALOG_LAST_UPDATED).await
    }

    // ===============================
    // COLLECTION
    // ===============================

    pub async fn load_collection(&self) -> Result<CollectionSnapshot, StorageError> {
        let items: Option<Vec<CollectionItem>> = self.storage.get_json(keys::COLLECTION_ITEMS).await?;
        let synced_at = self.storage.get_json(keys::COLLECTION_LAST_SYNC).await?;
        Ok(CollectionSnapshot {
            items: items.unwrap_or_default(),
            synced_at,
        })
    }

    pub async fn replace_collection(&self, snapshot: &CollectionSnapshot) -> Result<(), StorageError> {
        self.storage
            .put_many(vec![
                (
                    keys::COLLECTION_ITEMS.to_string(),
                    to_value(keys::COLLECTION_ITEMS, &snapshot.items)?,
                ),
                (
                    keys::COLLECTION_LAST_SYNC.to_string(),
                    to_value(keys::COLLECTION_LAST_SYNC, &snapshot.synced_at)?,
                ),
            ])
            .await
    }

    // ===============================
    // FLAGS
    // ===============================

    pub async fn initial_sync_done(&self) -> Result<bool, StorageError> {
        Ok(self
            .storage
            .get_json(keys::INITIAL_SYNC_DONE)
            .await?
            .unwrap_or(false))
    }

    pub async fn mark_initial_sync_done(&self) -> Result<(), StorageError> {
        self.storage.put_json(keys::INITIAL_SYNC_DONE, &true).await
    }

    /// Everything but the credential flag, which the caller fills in.
    pub async fn status(&self) -> Result<StorageStatus, StorageError> {
        let catalog = self.load_catalog().await?;
        let collection = self.load_collection().await?;
        Ok(StorageStatus {
            catalog_entries: catalog.len(),
            catalog_last_updated: self.catalog_last_updated().await?,
            collection_items: collection.len(),
            collection_last_sync: collection.synced_at,
            initial_sync_done: self.initial_sync_done().await?,
            credential_configured: false,
        })
    }
}
