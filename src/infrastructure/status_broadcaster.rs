//! Status fan-out to whatever presentation layer is listening
//!
//! Backed by a `tokio::sync::broadcast` channel; sending with no
//! subscribers is not an error, the event is simply dropped.

use tokio::sync::broadcast;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{OperationKind, OperationProgress, ProgressSink, StatusEvent};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct StatusBroadcaster {
    sender: broadcast::Sender<StatusEvent>,
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: StatusEvent) {
        if event.error {
            error!("[{}] {}", event.operation, event.text);
        } else if event.done {
            info!("[{}] {}", event.operation, event.text);
        } else {
            debug!("[{}] {}", event.operation, event.text);
        }
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    /// Progress sink tagging every event with one operation.
    pub fn for_operation(&self, operation_id: Uuid, operation: OperationKind) -> OperationReporter {
        OperationReporter {
            broadcaster: self.clone(),
            operation_id,
            operation,
        }
    }
}

/// Forwards one operation's progress as status events.
pub struct OperationReporter {
    broadcaster: StatusBroadcaster,
    operation_id: Uuid,
    operation: OperationKind,
}

impl OperationReporter {
    pub fn completed(&self, text: impl Into<String>) {
        self.broadcaster
            .emit(StatusEvent::completed(self.operation_id, self.operation, text));
    }

    pub fn failed(&self, text: impl Into<String>) {
        self.broadcaster
            .emit(StatusEvent::failed(self.operation_id, self.operation, text));
    }
}

impl ProgressSink for OperationReporter {
    fn report(&self, progress: OperationProgress) {
        self.broadcaster.emit(StatusEvent::progress(
            self.operation_id,
            self.operation,
            progress.to_string(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_tagged_events() {
        let broadcaster = StatusBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        let id = Uuid::new_v4();
        let reporter = broadcaster.for_operation(id, OperationKind::CollectionSync);

        reporter.report(OperationProgress::PageStarted { page: 2 });
        reporter.completed("Done: 3 products synced.");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.operation_id, id);
        assert_eq!(first.text, "Syncing page 2…");
        assert!(!first.done);

        let last = rx.recv().await.unwrap();
        assert!(last.done && !last.error);
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let broadcaster = StatusBroadcaster::new();
        broadcaster
            .for_operation(Uuid::new_v4(), OperationKind::CatalogRefresh)
            .failed("HTTP 500");
    }
}
