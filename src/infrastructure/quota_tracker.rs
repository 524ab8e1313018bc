//! Persisted daily request counter with a fixed cap
//!
//! One counter per UTC calendar day under `quota::<YYYY-MM-DD>`. The
//! read-modify-write in `try_consume` is serialized by an async mutex so
//! concurrent resolutions can never push a day past the cap.

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::errors::StorageError;
use super::key_value_store::{Storage, keys};

pub struct QuotaTracker {
    storage: Storage,
    daily_limit: u32,
    consume_lock: Mutex<()>,
}

impl QuotaTracker {
    pub fn new(storage: Storage, daily_limit: u32) -> Self {
        Self {
            storage,
            daily_limit,
            consume_lock: Mutex::new(()),
        }
    }

    /// `YYYY-MM-DD` for `date`.
    pub fn date_key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Takes one unit from today's budget; `false` when the cap is reached.
    pub async fn try_consume(&self) -> Result<bool, StorageError> {
        self.try_consume_on(Self::today()).await
    }

    pub async fn try_consume_on(&self, date: NaiveDate) -> Result<bool, StorageError> {
        let key = keys::quota(&Self::date_key(date));
        let _guard = self.consume_lock.lock().await;

        let used: u32 = self.storage.get_json(&key).await?.unwrap_or(0);
        if used >= self.daily_limit {
            info!("Daily quota exhausted for {} ({}/{})", date, used, self.daily_limit);
            return Ok(false);
        }

        self.storage.put_json(&key, &(used + 1)).await?;
        debug!("Quota consumed for {}: {}/{}", date, used + 1, self.daily_limit);
        Ok(true)
    }

    /// Units used on `date`.
    pub async fn used_on(&self, date: NaiveDate) -> Result<u32, StorageError> {
        Ok(self
            .storage
            .get_json(&keys::quota(&Self::date_key(date)))
            .await?
            .unwrap_or(0))
    }
}
