//! Persisted per-key enrichment cache with a fixed time-to-live
//!
//! Entries are never deleted; an entry older than the TTL is simply a miss.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::{EnrichedSet, ProductKey};

use super::errors::StorageError;
use super::key_value_store::{Storage, keys};

#[derive(Clone)]
pub struct TimedCache {
    storage: Storage,
    ttl: Duration,
}

impl TimedCache {
    pub fn new(storage: Storage, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    /// Live entry for `key`, if any.
    pub async fn get(&self, key: &ProductKey) -> Result<Option<EnrichedSet>, StorageError> {
        self.get_at(key, Utc::now()).await
    }

    /// Live entry for `key` as seen at `now`.
    pub async fn get_at(
        &self,
        key: &ProductKey,
        now: DateTime<Utc>,
    ) -> Result<Option<EnrichedSet>, StorageError> {
        let entry: Option<EnrichedSet> = self.storage.get_json(&keys::enrichment(key.as_str())).await?;
        Ok(entry.filter(|entry| {
            let fresh = entry.is_fresh(self.ttl, now);
            if !fresh {
                debug!("Cache entry for {} expired (stored at {})", key, entry.stored_at);
            }
            fresh
        }))
    }

    /// Stores `entry` under its own key; `stored_at` is taken from the entry.
    pub async fn put(&self, entry: &EnrichedSet) -> Result<(), StorageError> {
        self.storage
            .put_json(&keys::enrichment(entry.key.as_str()), entry)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &ProductKey, stored_at: DateTime<Utc>) -> EnrichedSet {
        EnrichedSet {
            key: key.clone(),
            name: "Lion Knights' Castle".into(),
            image_url: "https://cdn.example/10305.jpg".into(),
            set_num: "10305-1".into(),
            catalog_id: "10305".into(),
            year: Some(2022),
            stored_at,
        }
    }

    #[tokio::test]
    async fn returns_fresh_entries() {
        let cache = TimedCache::new(Storage::in_memory(), Duration::days(30));
        let key = ProductKey::parse("m50301").unwrap();
        let stored = entry(&key, Utc::now() - Duration::days(29));

        cache.put(&stored).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = TimedCache::new(Storage::in_memory(), Duration::days(30));
        let key = ProductKey::parse("M50301").unwrap();
        let now = Utc::now();
        cache.put(&entry(&key, now - Duration::days(31))).await.unwrap();

        assert!(cache.get_at(&key, now).await.unwrap().is_none());
        // still present, only aged out
        assert!(cache.get_at(&key, now - Duration::days(2)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_keys_are_misses() {
        let cache = TimedCache::new(Storage::in_memory(), Duration::days(30));
        assert!(cache.get(&ProductKey::parse("N1").unwrap()).await.unwrap().is_none());
    }
}
