//! Domain module - keys, entities and the catalog index
//!
//! Pure types and functions; nothing in here performs I/O.

pub mod catalog_index;
pub mod entities;
pub mod events;
pub mod product_key;

pub use catalog_index::{CatalogIndex, SetRow, ThemeRow};
pub use entities::{CatalogEntry, CollectionItem, CollectionSnapshot, EnrichedSet};
pub use events::{
    CatalogTable, OperationKind, OperationProgress, ProgressSink, RecordingProgress, StatusEvent,
};
pub use product_key::{
    ProductKey, catalog_id_from_set_num, derive_catalog_id, extract_key_from_href,
    extract_key_from_text, normalize_key,
};
