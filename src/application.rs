//! Application layer: the core flows and the state that wires them
//!
//! - `enrichment_resolver` + `resolver_session`: cached, quota-limited,
//!   deduplicating key resolution
//! - `collection_sync`: paginated listing walk and snapshot replacement
//! - `catalog_refresh`: catalog table download and snapshot replacement
//! - `state`: `AppState`, built once per process

pub mod catalog_refresh;
pub mod collection_sync;
pub mod enrichment_resolver;
pub mod resolver_session;
pub mod state;

pub use catalog_refresh::{CatalogRefreshError, CatalogRefresher};
pub use collection_sync::{CollectionSyncError, PaginatedCollector};
pub use enrichment_resolver::EnrichmentResolver;
pub use resolver_session::{
    Admission, InflightRegistry, ResolverSession, RetrySession, RetryState, SharedResolution,
};
pub use state::{ActiveOperation, ActiveOperations, AppState, RemoteCollaborators};
