//! Process-lifetime resolver state
//!
//! `ResolverSession` owns the per-key retry bookkeeping, the in-flight
//! registry and the quota-exhausted flag. None of it is persisted: a new
//! process starts with every key eligible again.
//!
//! The retry-ceiling check and the in-flight check-and-insert happen in one
//! critical section (`admit`), so two callers racing on the same key can
//! never both start a remote attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{EnrichedSet, ProductKey};

/// Outcome of one resolution, shared by every caller that joined it.
pub type SharedResolution = Shared<BoxFuture<'static, Option<EnrichedSet>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempts: u32,
    pub last_attempt_at: Instant,
}

/// Per-key attempt counter with a fixed ceiling and delay schedule
#[derive(Debug)]
pub struct RetrySession {
    max_attempts: u32,
    delays: Vec<Duration>,
    states: HashMap<ProductKey, RetryState>,
}

impl RetrySession {
    pub fn new(max_attempts: u32, delays: Vec<Duration>) -> Self {
        Self {
            max_attempts,
            delays,
            states: HashMap::new(),
        }
    }

    pub fn attempts(&self, key: &ProductKey) -> u32 {
        self.states.get(key).map_or(0, |state| state.attempts)
    }

    pub fn state(&self, key: &ProductKey) -> Option<RetryState> {
        self.states.get(key).copied()
    }

    pub fn is_benched(&self, key: &ProductKey) -> bool {
        self.attempts(key) >= self.max_attempts
    }

    /// Wait before the next attempt, indexed by failures so far.
    pub fn delay_before_next(&self, key: &ProductKey) -> Duration {
        let attempts = self.attempts(key) as usize;
        self.delays
            .get(attempts)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn record_failure(&mut self, key: &ProductKey) -> u32 {
        let state = self.states.entry(key.clone()).or_insert(RetryState {
            attempts: 0,
            last_attempt_at: Instant::now(),
        });
        state.attempts = (state.attempts + 1).min(self.max_attempts);
        state.last_attempt_at = Instant::now();
        state.attempts
    }

    pub fn clear(&mut self, key: &ProductKey) {
        self.states.remove(key);
    }
}

/// At most one outstanding resolution per key
#[derive(Default)]
pub struct InflightRegistry {
    pending: HashMap<ProductKey, SharedResolution>,
}

impl InflightRegistry {
    pub fn get(&self, key: &ProductKey) -> Option<SharedResolution> {
        self.pending.get(key).cloned()
    }

    pub fn contains(&self, key: &ProductKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn insert(&mut self, key: ProductKey, resolution: SharedResolution) {
        self.pending.insert(key, resolution);
    }

    pub fn remove(&mut self, key: &ProductKey) {
        self.pending.remove(key);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

struct SessionTables {
    retries: RetrySession,
    inflight: InflightRegistry,
}

/// What `admit` decided for a key
pub enum Admission {
    /// Retry ceiling reached for this session
    Benched,
    /// Another caller's resolution is already running
    Joined(SharedResolution),
    /// A new resolution was started and registered
    Started(SharedResolution),
}

pub struct ResolverSession {
    tables: Mutex<SessionTables>,
    quota_exhausted: AtomicBool,
    shutdown: CancellationToken,
}

impl ResolverSession {
    pub fn new(max_attempts: u32, retry_delays: Vec<Duration>) -> Self {
        Self {
            tables: Mutex::new(SessionTables {
                retries: RetrySession::new(max_attempts, retry_delays),
                inflight: InflightRegistry::default(),
            }),
            quota_exhausted: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    fn tables(&self) -> MutexGuard<'_, SessionTables> {
        // Nothing in the critical sections can leave the tables inconsistent.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Benched, joined or started, decided atomically.
    ///
    /// `start` receives the backoff delay for the new attempt and must not
    /// block; it runs while the session lock is held.
    pub fn admit<F>(&self, key: &ProductKey, start: F) -> Admission
    where
        F: FnOnce(Duration) -> SharedResolution,
    {
        let mut tables = self.tables();

        if tables.retries.is_benched(key) {
            debug!("{} reached the attempt ceiling this session; skipping", key);
            return Admission::Benched;
        }

        if let Some(pending) = tables.inflight.get(key) {
            debug!("{} already in flight; joining", key);
            return Admission::Joined(pending);
        }

        let delay = tables.retries.delay_before_next(key);
        let resolution = start(delay);
        tables.inflight.insert(key.clone(), resolution.clone());
        Admission::Started(resolution)
    }

    /// Removes `key` from the in-flight registry when dropped.
    pub fn inflight_guard(self: &Arc<Self>, key: ProductKey) -> InflightGuard {
        InflightGuard {
            session: Arc::clone(self),
            key,
        }
    }

    pub fn record_failure(&self, key: &ProductKey) -> u32 {
        let attempts = self.tables().retries.record_failure(key);
        debug!("{} failed attempt {}", key, attempts);
        attempts
    }

    pub fn record_success(&self, key: &ProductKey) {
        self.tables().retries.clear(key);
    }

    pub fn attempts(&self, key: &ProductKey) -> u32 {
        self.tables().retries.attempts(key)
    }

    pub fn retry_state(&self, key: &ProductKey) -> Option<RetryState> {
        self.tables().retries.state(key)
    }

    pub fn is_inflight(&self, key: &ProductKey) -> bool {
        self.tables().inflight.contains(key)
    }

    pub fn inflight_count(&self) -> usize {
        self.tables().inflight.len()
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.quota_exhausted.load(Ordering::Acquire)
    }

    pub fn mark_quota_exhausted(&self) {
        if !self.quota_exhausted.swap(true, Ordering::AcqRel) {
            info!("Local daily quota exhausted; no further remote lookups this session");
        }
    }

    /// Session-wide token; cancelling it aborts backoff waits and requests.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

pub struct InflightGuard {
    session: Arc<ResolverSession>,
    key: ProductKey,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.session.tables().inflight.remove(&self.key);
    }
}
