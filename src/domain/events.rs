//! Status and progress events
//!
//! Long-running commands (catalog refresh, collection sync) report
//! `OperationProgress` through a `ProgressSink`. The command layer wraps
//! those into `StatusEvent`s for whatever presentation layer is listening.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which command an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CatalogRefresh,
    CollectionSync,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatalogRefresh => write!(f, "catalog refresh"),
            Self::CollectionSync => write!(f, "collection sync"),
        }
    }
}

/// Catalog table being downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogTable {
    Sets,
    Themes,
}

impl fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sets => write!(f, "sets"),
            Self::Themes => write!(f, "themes"),
        }
    }
}

/// Fine-grained progress emitted by the core flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationProgress {
    Downloading { table: CatalogTable },
    ParsingTables,
    BuildingCatalog,
    CatalogSaved { entries: usize },
    SyncStarted,
    PageStarted { page: u32 },
    PageCollected { page: u32, items: usize },
    ListingExhausted { last_page: u32 },
    CollectionSaved { items: usize },
}

impl fmt::Display for OperationProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading { table } => write!(f, "Downloading {table} table…"),
            Self::ParsingTables => write!(f, "Parsing CSV…"),
            Self::BuildingCatalog => write!(f, "Building catalog…"),
            Self::CatalogSaved { entries } => write!(f, "Done. Catalog saved ({entries} sets)."),
            Self::SyncStarted => write!(f, "Syncing store listing…"),
            Self::PageStarted { page } => write!(f, "Syncing page {page}…"),
            Self::PageCollected { page, items } => write!(f, "Page {page}: {items} products"),
            Self::ListingExhausted { last_page } => {
                write!(f, "Listing ended after page {last_page}")
            }
            Self::CollectionSaved { items } => write!(f, "Done: {items} products synced."),
        }
    }
}

/// Receives progress from the core flows.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: OperationProgress);
}

/// Discards progress.
impl ProgressSink for () {
    fn report(&self, _progress: OperationProgress) {}
}

/// Keeps every progress event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<OperationProgress>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OperationProgress> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, progress: OperationProgress) {
        if let Ok(mut events) = self.events.lock() {
            events.push(progress);
        }
    }
}

/// Notification delivered to listeners of a fire-and-forget command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub operation_id: Uuid,
    pub operation: OperationKind,
    pub text: String,
    pub error: bool,
    pub done: bool,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn progress(operation_id: Uuid, operation: OperationKind, text: impl Into<String>) -> Self {
        Self {
            operation_id,
            operation,
            text: text.into(),
            error: false,
            done: false,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(operation_id: Uuid, operation: OperationKind, text: impl Into<String>) -> Self {
        Self {
            done: true,
            ..Self::progress(operation_id, operation, text)
        }
    }

    pub fn failed(operation_id: Uuid, operation: OperationKind, text: impl Into<String>) -> Self {
        Self {
            error: true,
            done: true,
            ..Self::progress(operation_id, operation, text)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.done || self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_text_is_human_readable() {
        assert_eq!(OperationProgress::PageStarted { page: 4 }.to_string(), "Syncing page 4…");
        assert_eq!(
            OperationProgress::CollectionSaved { items: 12 }.to_string(),
            "Done: 12 products synced."
        );
        assert_eq!(
            OperationProgress::Downloading { table: CatalogTable::Themes }.to_string(),
            "Downloading themes table…"
        );
    }

    #[test]
    fn terminal_events_carry_flags() {
        let id = Uuid::new_v4();
        let failed = StatusEvent::failed(id, OperationKind::CatalogRefresh, "boom");
        assert!(failed.error && failed.done && failed.is_terminal());
        assert!(!StatusEvent::progress(id, OperationKind::CollectionSync, "page 1").is_terminal());
    }

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingProgress::new();
        sink.report(OperationProgress::SyncStarted);
        sink.report(OperationProgress::PageStarted { page: 1 });
        assert_eq!(
            sink.events(),
            vec![OperationProgress::SyncStarted, OperationProgress::PageStarted { page: 1 }]
        );
    }
}
