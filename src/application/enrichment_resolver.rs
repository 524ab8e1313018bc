//! Enrichment resolver: product key -> registry metadata
//!
//! `resolve` never fails. Every failure is absorbed into `None` plus advisory
//! state (retry counts, quota flag) that shapes later calls. Guards run in
//! this order:
//!
//! 1. normalize the key (blank keys resolve to `None` without I/O)
//! 2. live cache hit wins, even when quota or retries would refuse
//! 3. quota-exhausted flag
//! 4. credential configured
//! 5. retry ceiling, then in-flight join, then start (one critical section)
//!
//! A started attempt runs as its own task so it completes even when every
//! caller stops waiting; only the session shutdown token can abort it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{EnrichedSet, ProductKey, catalog_id_from_set_num};
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::quota_tracker::QuotaTracker;
use crate::infrastructure::registry_client::{RegistrySet, SetLookup};
use crate::infrastructure::timed_cache::TimedCache;

use super::resolver_session::{Admission, ResolverSession, SharedResolution};

struct ResolverInner {
    cache: TimedCache,
    quota: Arc<QuotaTracker>,
    credentials: Arc<CredentialStore>,
    lookup: Arc<dyn SetLookup>,
    session: Arc<ResolverSession>,
}

#[derive(Clone)]
pub struct EnrichmentResolver {
    inner: Arc<ResolverInner>,
}

impl EnrichmentResolver {
    pub fn new(
        cache: TimedCache,
        quota: Arc<QuotaTracker>,
        credentials: Arc<CredentialStore>,
        lookup: Arc<dyn SetLookup>,
        session: Arc<ResolverSession>,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                cache,
                quota,
                credentials,
                lookup,
                session,
            }),
        }
    }

    pub fn session(&self) -> &Arc<ResolverSession> {
        &self.inner.session
    }

    /// Metadata for `raw_key`, or `None`.
    ///
    /// Cancelling `cancellation_token` only stops this caller from waiting;
    /// an attempt already started keeps running for the other callers and
    /// still updates the cache and retry state.
    pub async fn resolve(
        &self,
        raw_key: &str,
        cancellation_token: &CancellationToken,
    ) -> Option<EnrichedSet> {
        let key = ProductKey::parse(raw_key)?;
        let inner = &self.inner;

        match inner.cache.get(&key).await {
            Ok(Some(hit)) => {
                debug!("Cache hit for {}", key);
                return Some(hit);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        if inner.session.is_quota_exhausted() {
            debug!("Quota exhausted; not resolving {}", key);
            return None;
        }

        let Some(credential) = inner.credentials.current() else {
            debug!("No registry credential; skipping remote lookup for {}", key);
            return None;
        };

        let resolution = match inner.session.admit(&key, |delay| {
            Self::start_attempt(Arc::clone(inner), key.clone(), credential, delay)
        }) {
            Admission::Benched => return None,
            Admission::Joined(pending) | Admission::Started(pending) => pending,
        };

        tokio::select! {
            outcome = resolution => outcome,
            _ = cancellation_token.cancelled() => {
                debug!("Caller stopped waiting for {}", key);
                None
            }
        }
    }

    /// Resolves every key concurrently; results keep the input order.
    pub async fn resolve_many<S: AsRef<str>>(
        &self,
        raw_keys: &[S],
        cancellation_token: &CancellationToken,
    ) -> Vec<Option<EnrichedSet>> {
        join_all(
            raw_keys
                .iter()
                .map(|raw| self.resolve(raw.as_ref(), cancellation_token)),
        )
        .await
    }

    fn start_attempt(
        inner: Arc<ResolverInner>,
        key: ProductKey,
        credential: String,
        delay: Duration,
    ) -> SharedResolution {
        let handle = tokio::spawn(async move {
            let _inflight = inner.session.inflight_guard(key.clone());
            inner.attempt(&key, &credential, delay).await
        });

        handle
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Resolution task ended abnormally: {}", e);
                    None
                }
            })
            .boxed()
            .shared()
    }
}

impl ResolverInner {
    async fn attempt(
        &self,
        key: &ProductKey,
        credential: &str,
        delay: Duration,
    ) -> Option<EnrichedSet> {
        let shutdown = self.session.shutdown_token();

        if !delay.is_zero() {
            debug!("Waiting {:?} before retrying {}", delay, key);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => return None,
            }

            // another caller may have succeeded in the meantime
            if let Ok(Some(hit)) = self.cache.get(key).await {
                return Some(hit);
            }
        }

        match self.quota.try_consume().await {
            Ok(true) => {}
            Ok(false) => {
                self.session.mark_quota_exhausted();
                return None;
            }
            Err(e) => {
                warn!("Quota bookkeeping failed for {}: {}", key, e);
                return None;
            }
        }

        let catalog_id = key.catalog_id();
        debug!("Fetching {} as registry set {}", key, catalog_id);

        let set = match self.lookup.fetch_set(&catalog_id, credential, shutdown).await {
            Ok(set) => set,
            Err(e) if e.is_cancelled() => {
                debug!("Lookup for {} aborted by shutdown", key);
                return None;
            }
            Err(e) => {
                warn!("Registry lookup for {} failed: {}", key, e);
                self.session.record_failure(key);
                return None;
            }
        };

        let Some(entry) = enriched_from(key, &catalog_id, &set) else {
            warn!("Registry answer for {} has no name", key);
            self.session.record_failure(key);
            return None;
        };

        if let Err(e) = self.cache.put(&entry).await {
            warn!("Failed to cache {}: {}", key, e);
        }
        self.session.record_success(key);
        info!("Resolved {} -> {} ({})", key, entry.name, entry.set_num);
        Some(entry)
    }
}

/// Cache entry for a registry answer; `None` when the name is missing.
fn enriched_from(key: &ProductKey, requested_id: &str, set: &RegistrySet) -> Option<EnrichedSet> {
    let name = set.usable_name()?;
    let set_num = set.set_num.as_deref().unwrap_or_default().trim().to_string();
    let catalog_id = match catalog_id_from_set_num(&set_num) {
        id if id.is_empty() => requested_id.to_string(),
        id => id,
    };

    Some(EnrichedSet {
        key: key.clone(),
        name: name.to_string(),
        image_url: set.set_img_url.clone().unwrap_or_default(),
        set_num,
        catalog_id,
        year: set.year,
        stored_at: Utc::now(),
    })
}
