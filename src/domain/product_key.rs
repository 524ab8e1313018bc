//! Product key normalization and catalog id derivation
//!
//! Store-side keys look like `M12345` or `N9876`: one letter followed by a
//! run of digits. The authoritative catalog id is the digit run reversed
//! with the letter dropped, so `M12345` maps to `54321`. The transform is
//! lossy and deliberately has no inverse.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref HREF_PRODUCT_KEY: Regex = Regex::new(r"(?i)/products/.*?([mn]\d+)").expect("valid regex");
    static ref HREF_ANY_KEY: Regex = Regex::new(r"(?i)([mn]\d+)").expect("valid regex");
    static ref HREF_NUMERIC_PRODUCT: Regex = Regex::new(r"(?i)/products/(\d+)").expect("valid regex");
    static ref TEXT_KEY: Regex = Regex::new(r"(?i)\b([MN]\d+)\b").expect("valid regex");
}

/// Canonical (uppercase, trimmed) product key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKey(String);

impl ProductKey {
    /// Normalizes `raw`; returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_key(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier used against the remote registry and the catalog index.
    pub fn catalog_id(&self) -> String {
        derive_catalog_id(&self.0)
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Uppercase + trim.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Strips the one-letter prefix of a normalized key and reverses the rest.
///
/// Total over all inputs: an empty key yields an empty id and a single
/// letter yields an empty id as well.
pub fn derive_catalog_id(raw: &str) -> String {
    let normalized = normalize_key(raw);
    let mut chars = normalized.chars();
    if chars.next().is_none() {
        return String::new();
    }
    chars.rev().collect()
}

/// Catalog id embedded in a composite set number (`"10305-1"` -> `"10305"`).
pub fn catalog_id_from_set_num(set_num: &str) -> String {
    set_num
        .split('-')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Pulls a product key out of a link target.
///
/// Preference order: a key inside a `/products/` path, any key anywhere in
/// the link, then a bare numeric `/products/<digits>` treated as an `M` key.
pub fn extract_key_from_href(href: &str) -> Option<ProductKey> {
    if let Some(caps) = HREF_PRODUCT_KEY.captures(href) {
        return ProductKey::parse(&caps[1]);
    }
    if let Some(caps) = HREF_ANY_KEY.captures(href) {
        return ProductKey::parse(&caps[1]);
    }
    HREF_NUMERIC_PRODUCT
        .captures(href)
        .and_then(|caps| ProductKey::parse(&format!("M{}", &caps[1])))
}

/// First whole-word product key in free text.
pub fn extract_key_from_text(text: &str) -> Option<ProductKey> {
    TEXT_KEY
        .captures(text)
        .and_then(|caps| ProductKey::parse(&caps[1]))
}
