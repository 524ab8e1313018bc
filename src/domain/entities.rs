//! Core domain entities
//!
//! `EnrichedSet` is what the resolver caches per product key,
//! `CollectionItem` is one row of the synced store listing and
//! `CatalogEntry` is one row of the locally built catalog.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::product_key::ProductKey;

/// Names that identify bulk part packs rather than buildable sets.
pub const PARTS_PACK_KEYWORDS: [&str; 4] = ["Plates", "Beams", "Bricks", "Miscellaneous"];

/// Registry metadata for one product key (the persisted cache entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSet {
    pub key: ProductKey,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub set_num: String,
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default)]
    pub year: Option<u16>,
    pub stored_at: DateTime<Utc>,
}

impl EnrichedSet {
    /// Live when `now - stored_at <= ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.stored_at) <= ttl
    }

    /// `"<catalogId> - <name> (<year>) - <KEY>"`, omitting missing parts.
    pub fn display_title(&self, original_key: &str) -> String {
        let catalog_id = self.catalog_id.trim();
        let name = self.name.trim();
        let left = match (catalog_id.is_empty(), name.is_empty()) {
            (false, false) => format!("{catalog_id} - {name}"),
            (false, true) => catalog_id.to_string(),
            _ => name.to_string(),
        };
        let year = self.year.map(|y| format!(" ({y})")).unwrap_or_default();
        let raw_key = original_key.trim().to_uppercase();
        let right = if raw_key.is_empty() {
            String::new()
        } else {
            format!(" - {raw_key}")
        };
        format!("{left}{year}{right}").trim().to_string()
    }

    pub fn is_parts_pack(&self) -> bool {
        PARTS_PACK_KEYWORDS
            .iter()
            .any(|keyword| self.name.contains(keyword))
    }
}

/// One product scraped from the store listing, enriched from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    /// Empty when the store id could not be derived.
    pub catalog_id: String,
    pub store_id: String,
    pub name: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub theme_name: String,
    pub url: String,
}

impl CollectionItem {
    pub fn matches(&self, needle_lowercase: &str) -> bool {
        [
            self.name.as_str(),
            self.catalog_id.as_str(),
            self.store_id.as_str(),
            self.theme_name.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle_lowercase))
    }
}

/// One catalog row keyed by catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub catalog_id: String,
    pub name: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub image_url: String,
    pub set_num: String,
    #[serde(default)]
    pub theme_name: String,
}

/// Complete listing snapshot, replaced wholesale on every successful sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSnapshot {
    pub items: Vec<CollectionItem>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl CollectionSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Case-insensitive substring search over name, ids and theme.
    pub fn search(&self, query: &str) -> Vec<&CollectionItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.items.iter().filter(|item| item.matches(&needle)).collect()
    }
}
