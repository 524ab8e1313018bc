//! Flat key -> JSON value store
//!
//! Every piece of persisted state (enrichment cache, quota counters,
//! snapshots, credential) is one key in this store. `put_many` writes all
//! of its pairs in a single transaction so a snapshot and its timestamp
//! are never observed half-written.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use super::errors::StorageError;

/// Key layout of the persisted store
pub mod keys {
    pub const CATALOG_ENTRIES: &str = "catalog::entries";
    pub const CATALOG_LAST_UPDATED: &str = "catalog::last_updated";
    pub const COLLECTION_ITEMS: &str = "collection::items";
    pub const COLLECTION_LAST_SYNC: &str = "collection::last_sync";
    pub const INITIAL_SYNC_DONE: &str = "collection::initial_sync_done";
    pub const REGISTRY_CREDENTIAL: &str = "credential::registry_api_key";

    pub fn enrichment(product_key: &str) -> String {
        format!("enrichment::{product_key}")
    }

    pub fn quota(date_key: &str) -> String {
        format!("quota::{date_key}")
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;
    /// All-or-nothing write of several keys.
    async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// SQLite-backed store (table `kv_store`)
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn encode(key: &str, value: &Value) -> Result<String, StorageError> {
        serde_json::to_string(value).map_err(|e| StorageError::serialization(key, e))
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO kv_store (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
"#;

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value")?;
                let value =
                    serde_json::from_str(&raw).map_err(|e| StorageError::serialization(key, e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let encoded = Self::encode(key, &value)?;
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(encoded)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for (key, value) in &entries {
            let encoded = Self::encode(key, value)?;
            sqlx::query(UPSERT_SQL)
                .bind(key)
                .bind(encoded)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-process store for tests and throwaway runs
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        values.extend(entries);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// Typed access on top of a `KeyValueStore`
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::serialization(key, e)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = to_value(key, value)?;
        self.backend.put(key, value).await
    }

    /// Writes every pair atomically.
    pub async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        self.backend.put_many(entries).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.backend.remove(key).await
    }
}

/// Serializes `value` for storage under `key`.
pub fn to_value<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::serialization(key, e))
}
