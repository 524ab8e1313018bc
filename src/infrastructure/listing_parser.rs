//! Listing page markup extraction
//!
//! The collector only sees `PageParser`; pagination and termination logic
//! never depend on how candidates are pulled out of the markup.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::domain::extract_key_from_href;

/// One product link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCandidate {
    /// Normalized store key, empty when the link carries none
    pub store_id: String,
    /// Visible link text
    pub name: String,
    /// Absolute link target
    pub url: String,
}

pub trait PageParser: Send + Sync {
    fn parse(&self, raw_page: &str) -> Vec<ListingCandidate>;
}

/// Anchor-based extraction: every `<a href>` pointing under `/products/`.
pub struct MarkupPageParser {
    anchor_selector: Selector,
    base_url: Option<Url>,
}

const PRODUCT_PATH: &str = "/products/";

impl MarkupPageParser {
    /// `base_url` resolves relative links; unparsable bases leave links as found.
    pub fn new(base_url: &str) -> Self {
        Self {
            anchor_selector: Selector::parse("a[href]").expect("static selector"),
            base_url: Url::parse(base_url).ok(),
        }
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        self.base_url
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| href.to_string())
    }
}

impl PageParser for MarkupPageParser {
    fn parse(&self, raw_page: &str) -> Vec<ListingCandidate> {
        let document = Html::parse_document(raw_page);

        let candidates: Vec<ListingCandidate> = document
            .select(&self.anchor_selector)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?.trim();
                if !href.contains(PRODUCT_PATH) {
                    return None;
                }

                let name = anchor
                    .text()
                    .flat_map(str::split_whitespace)
                    .collect::<Vec<_>>()
                    .join(" ");

                Some(ListingCandidate {
                    store_id: extract_key_from_href(href)
                        .map(|key| key.as_str().to_string())
                        .unwrap_or_default(),
                    name,
                    url: self.absolutize(href),
                })
            })
            .collect();

        debug!("Parsed {} product links", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a href="/collections/brick-kits?page_num=2">Next</a>
          <div class="card">
            <a href="/products/m50301-castle"><span>Lion</span>
              Castle  M50301</a>
            <a href="/products/m50301-castle"><img src="x.jpg"></a>
          </div>
          <a href="https://shop.example/products/n1234-truck">Truck</a>
          <a href="/products/gift-card">Gift card</a>
        </body></html>
    "#;

    #[test]
    fn extracts_product_anchors_only() {
        let parser = MarkupPageParser::new("https://shop.example");
        let items = parser.parse(PAGE);

        assert_eq!(items.len(), 4);
        assert_eq!(
            items[0],
            ListingCandidate {
                store_id: "M50301".into(),
                name: "Lion Castle M50301".into(),
                url: "https://shop.example/products/m50301-castle".into(),
            }
        );
        // duplicates are left to the collector
        assert_eq!(items[1].url, items[0].url);
        assert_eq!(items[1].name, "");
        assert_eq!(items[2].store_id, "N1234");
        assert_eq!(items[3].store_id, "");
    }

    #[test]
    fn empty_page_yields_nothing() {
        let parser = MarkupPageParser::new("https://shop.example");
        assert!(parser.parse("<html><body><p>No products</p></body></html>").is_empty());
        assert!(parser.parse("").is_empty());
    }
}
