//! Scripted remote collaborators shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use brick_enricher::application::{AppState, EnrichmentResolver, RemoteCollaborators, ResolverSession};
use brick_enricher::domain::{CatalogTable, EnrichedSet, ProductKey};
use brick_enricher::infrastructure::config::{AppConfig, defaults};
use brick_enricher::infrastructure::{
    CatalogTableSource, CredentialStore, FetchError, ListingSource, MarkupPageParser,
    QuotaTracker, RegistrySet, SetLookup, Storage, TimedCache,
};

// ===============================
// REGISTRY
// ===============================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupBehavior {
    Succeed,
    FailStatus(u16),
    /// Connection-level failure before any response
    Transport,
    Timeout,
    Nameless,
}

/// Registry fake: counts calls, records when they happened.
pub struct ScriptedLookup {
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    requested: Mutex<Vec<String>>,
    script: Mutex<VecDeque<LookupBehavior>>,
    default_behavior: LookupBehavior,
    latency: Duration,
}

impl ScriptedLookup {
    pub fn new(default_behavior: LookupBehavior) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
            requested: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_behavior,
            latency: Duration::ZERO,
        }
    }

    pub fn succeeding() -> Self {
        Self::new(LookupBehavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::new(LookupBehavior::FailStatus(500))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Behaviors for the next calls, before falling back to the default.
    pub fn then(self, behavior: LookupBehavior) -> Self {
        self.script.lock().unwrap().push_back(behavior);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SetLookup for ScriptedLookup {
    async fn fetch_set(
        &self,
        catalog_id: &str,
        _credential: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<RegistrySet, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        self.requested.lock().unwrap().push(catalog_id.to_string());

        let url = format!("https://registry.test/api/v3/lego/sets/{catalog_id}-1/");
        if !self.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.latency) => {}
                _ = cancellation_token.cancelled() => return Err(FetchError::Cancelled { url }),
            }
        }

        let behavior = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_behavior);

        match behavior {
            LookupBehavior::Succeed => Ok(RegistrySet {
                name: Some(format!("Set {catalog_id}")),
                set_num: Some(format!("{catalog_id}-1")),
                year: Some(2020),
                set_img_url: Some(format!("https://cdn.test/{catalog_id}.jpg")),
            }),
            LookupBehavior::FailStatus(status) => Err(FetchError::Status { status, url }),
            LookupBehavior::Transport => Err(FetchError::Transport {
                source: transport_error(),
                url,
            }),
            LookupBehavior::Timeout => Err(FetchError::Timeout { url, seconds: 15 }),
            LookupBehavior::Nameless => Ok(RegistrySet::default()),
        }
    }
}

/// A real `reqwest::Error` without touching the network.
fn transport_error() -> reqwest::Error {
    reqwest::Client::new()
        .get("not a url")
        .build()
        .unwrap_err()
}

/// Resolver plus the handles tests inspect.
pub struct ResolverHarness {
    pub resolver: EnrichmentResolver,
    pub lookup: Arc<ScriptedLookup>,
    pub cache: TimedCache,
    pub quota: Arc<QuotaTracker>,
    pub credentials: Arc<CredentialStore>,
    pub session: Arc<ResolverSession>,
}

impl ResolverHarness {
    pub fn new(lookup: ScriptedLookup) -> Self {
        Self::with_limit(lookup, defaults::DAILY_LIMIT)
    }

    pub fn with_limit(lookup: ScriptedLookup, daily_limit: u32) -> Self {
        let storage = Storage::in_memory();
        let lookup = Arc::new(lookup);
        let cache = TimedCache::new(storage.clone(), chrono::Duration::days(defaults::CACHE_TTL_DAYS));
        let quota = Arc::new(QuotaTracker::new(storage.clone(), daily_limit));
        let credentials = Arc::new(CredentialStore::ephemeral(storage, Some("test-key")));
        let session = Arc::new(ResolverSession::new(
            defaults::MAX_ATTEMPTS,
            defaults::RETRY_DELAYS_MS.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        ));

        let resolver = EnrichmentResolver::new(
            cache.clone(),
            Arc::clone(&quota),
            Arc::clone(&credentials),
            lookup.clone() as Arc<dyn SetLookup>,
            Arc::clone(&session),
        );

        Self {
            resolver,
            lookup,
            cache,
            quota,
            credentials,
            session,
        }
    }
}

pub fn key(raw: &str) -> ProductKey {
    ProductKey::parse(raw).unwrap()
}

pub fn cached_entry(raw_key: &str, stored_at: DateTime<Utc>) -> EnrichedSet {
    let key = key(raw_key);
    EnrichedSet {
        catalog_id: key.catalog_id(),
        set_num: format!("{}-1", key.catalog_id()),
        name: "Cached Set".into(),
        image_url: String::new(),
        year: Some(2001),
        key,
        stored_at,
    }
}

// ===============================
// LISTING
// ===============================

#[derive(Debug, Clone)]
pub enum PageScript {
    Body(String),
    Status(u16),
    TransportFailure,
}

/// Listing fake; unscripted pages are empty.
#[derive(Default)]
pub struct ScriptedListing {
    pages: HashMap<u32, PageScript>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, script: PageScript) -> Self {
        self.pages.insert(page, script);
        self
    }

    /// Page `page` with one product link per key.
    pub fn products(self, page: u32, keys: &[&str]) -> Self {
        self.page(page, PageScript::Body(listing_page(keys)))
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for ScriptedListing {
    async fn fetch_page(
        &self,
        page: u32,
        _cancellation_token: &CancellationToken,
    ) -> Result<Option<String>, FetchError> {
        self.requested.lock().unwrap().push(page);
        match self.pages.get(&page) {
            Some(PageScript::Body(body)) => Ok(Some(body.clone())),
            Some(PageScript::Status(_)) => Ok(None),
            Some(PageScript::TransportFailure) => Err(FetchError::Timeout {
                url: format!("https://shop.test/collections/brick-kits?page_num={page}"),
                seconds: 15,
            }),
            None => Ok(Some("<html><body><p>No products found</p></body></html>".into())),
        }
    }
}

pub fn listing_page(keys: &[&str]) -> String {
    let anchors: String = keys
        .iter()
        .map(|k| {
            format!(
                r#"<div class="card"><a href="/products/{lower}-kit"><span>Kit</span> {k}</a></div>"#,
                lower = k.to_lowercase()
            )
        })
        .collect();
    format!("<html><body>{anchors}</body></html>")
}

// ===============================
// CATALOG TABLES
// ===============================

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub const SETS_CSV: &str = "set_num,name,year,theme_id,num_parts,img_url\n\
10305-1,Lion Knights' Castle,2022,186,4514,https://cdn.test/10305.jpg\n\
4321-1,Harbor Tug,1999,67,210,\n";

pub const THEMES_CSV: &str = "id,name,parent_id\n186,Castle,\n67,Town,\n";

/// Catalog fake answering each download from a per-table queue.
pub struct ScriptedCatalog {
    responses: Mutex<HashMap<CatalogTable, VecDeque<Result<Vec<u8>, u16>>>>,
    downloads: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn serves(self, table: CatalogTable, body: Vec<u8>) -> Self {
        self.push(table, Ok(body))
    }

    pub fn fails(self, table: CatalogTable, status: u16) -> Self {
        self.push(table, Err(status))
    }

    fn push(self, table: CatalogTable, response: Result<Vec<u8>, u16>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push_back(response);
        self
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogTableSource for ScriptedCatalog {
    async fn download(
        &self,
        table: CatalogTable,
        _cancellation_token: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let url = format!("https://cdn.test/{table}.csv.gz");
        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&table)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(FetchError::Status { status, url }),
            None => Err(FetchError::Status { status: 404, url }),
        }
    }
}

// ===============================
// APP STATE
// ===============================

pub fn app_state(
    lookup: Arc<ScriptedLookup>,
    listing: Arc<ScriptedListing>,
    catalog: Arc<ScriptedCatalog>,
) -> (Arc<AppState>, Storage) {
    let storage = Storage::in_memory();
    let config = AppConfig::default();
    let remote = RemoteCollaborators {
        registry: lookup,
        listing,
        parser: Arc::new(MarkupPageParser::new("https://shop.test")),
        catalog,
    };
    let credentials = CredentialStore::ephemeral(storage.clone(), Some("test-key"));
    let state = AppState::assemble(config, storage.clone(), credentials, remote);
    (Arc::new(state), storage)
}
