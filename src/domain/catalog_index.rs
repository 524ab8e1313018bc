//! Catalog index: catalog id -> catalog entry
//!
//! Built once per catalog refresh from the registry's `sets` and `themes`
//! tables. Rows without a usable set number are skipped; when two rows
//! share a catalog id the later row wins.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::entities::CatalogEntry;
use super::product_key::catalog_id_from_set_num;

/// One row of the sets table. Unknown columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SetRow {
    #[serde(default)]
    pub set_num: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub theme_id: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub set_img_url: String,
}

/// One row of the themes table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ThemeRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogIndex {
    entries: BTreeMap<String, CatalogEntry>,
}

impl CatalogIndex {
    pub fn build(sets: &[SetRow], themes: &[ThemeRow]) -> Self {
        let theme_names: HashMap<&str, &str> = themes
            .iter()
            .map(|theme| (theme.id.trim(), theme.name.trim()))
            .collect();

        let mut entries = BTreeMap::new();
        for row in sets {
            let set_num = row.set_num.trim();
            let catalog_id = catalog_id_from_set_num(set_num);
            if catalog_id.is_empty() {
                continue;
            }

            let image_url = if row.img_url.trim().is_empty() {
                row.set_img_url.trim()
            } else {
                row.img_url.trim()
            };

            let entry = CatalogEntry {
                catalog_id: catalog_id.clone(),
                name: row.name.trim().to_string(),
                year: row.year.trim().parse().ok(),
                image_url: image_url.to_string(),
                set_num: set_num.to_string(),
                theme_name: theme_names
                    .get(row.theme_id.trim())
                    .map(|name| (*name).to_string())
                    .unwrap_or_default(),
            };
            entries.insert(catalog_id, entry);
        }

        Self { entries }
    }

    pub fn lookup(&self, catalog_id: &str) -> Option<&CatalogEntry> {
        let catalog_id = catalog_id.trim();
        if catalog_id.is_empty() {
            return None;
        }
        self.entries.get(catalog_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

impl FromIterator<CatalogEntry> for CatalogIndex {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.catalog_id.clone(), entry))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_row(set_num: &str, name: &str, year: &str, theme_id: &str) -> SetRow {
        SetRow {
            set_num: set_num.to_string(),
            name: name.to_string(),
            year: year.to_string(),
            theme_id: theme_id.to_string(),
            img_url: format!("https://cdn.example/sets/{set_num}.jpg"),
            set_img_url: String::new(),
        }
    }

    #[test]
    fn builds_entries_keyed_by_catalog_id_with_theme_names() {
        let sets = vec![
            set_row("10305-1", "Lion Knights' Castle", "2022", "721"),
            set_row("75192-1", "Millennium Falcon", "2017", "171"),
        ];
        let themes = vec![
            ThemeRow { id: "721".into(), name: "Icons".into() },
            ThemeRow { id: "171".into(), name: "Ultimate Collector Series".into() },
        ];

        let index = CatalogIndex::build(&sets, &themes);

        assert_eq!(index.len(), 2);
        let castle = index.lookup("10305").expect("castle present");
        assert_eq!(castle.name, "Lion Knights' Castle");
        assert_eq!(castle.year, Some(2022));
        assert_eq!(castle.theme_name, "Icons");
        assert_eq!(castle.set_num, "10305-1");
    }

    #[test]
    fn skips_rows_without_set_number_and_tolerates_unknown_theme() {
        let sets = vec![
            set_row("", "Nameless", "2000", "1"),
            set_row("6000-1", "Idea Book", "n/a", "999"),
        ];

        let index = CatalogIndex::build(&sets, &[]);

        assert_eq!(index.len(), 1);
        let book = index.lookup("6000").unwrap();
        assert_eq!(book.year, None);
        assert!(book.theme_name.is_empty());
    }

    #[test]
    fn falls_back_to_set_img_url_column() {
        let mut row = set_row("42115-1", "Sian", "2020", "1");
        row.img_url.clear();
        row.set_img_url = "https://cdn.example/alt.jpg".into();

        let index = CatalogIndex::build(&[row], &[]);

        assert_eq!(index.lookup("42115").unwrap().image_url, "https://cdn.example/alt.jpg");
    }

    #[test]
    fn later_variant_wins_for_shared_catalog_id() {
        let sets = vec![
            set_row("10305-1", "First", "2022", "1"),
            set_row("10305-2", "Second", "2022", "1"),
        ];
        let index = CatalogIndex::build(&sets, &[]);
        assert_eq!(index.lookup("10305").unwrap().name, "Second");
        assert!(index.lookup("").is_none());
    }
}
