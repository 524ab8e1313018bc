//! Collection commands: sync and search

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::state::AppState;
use crate::domain::{CollectionItem, CollectionSnapshot, OperationKind};

use super::CommandAck;

/// Starts a collection sync in the background.
pub fn sync_collection(state: &Arc<AppState>) -> CommandAck {
    let Some(active) = state.operations.try_begin(OperationKind::CollectionSync) else {
        return CommandAck::already_running(OperationKind::CollectionSync);
    };

    let operation_id = Uuid::new_v4();
    let cancellation_token = state.resolver.session().shutdown_token().child_token();
    let task_state = Arc::clone(state);
    tokio::spawn(async move {
        let _active = active;
        let _ = sync_with_status(&task_state, operation_id, &cancellation_token).await;
    });

    CommandAck::accepted(operation_id, OperationKind::CollectionSync)
}

/// Syncs the collection and waits for the new snapshot.
pub async fn run_sync_collection(
    state: &AppState,
    cancellation_token: &CancellationToken,
) -> Result<CollectionSnapshot, String> {
    let Some(_active) = state.operations.try_begin(OperationKind::CollectionSync) else {
        return Err(CommandAck::already_running(OperationKind::CollectionSync).message);
    };
    sync_with_status(state, Uuid::new_v4(), cancellation_token).await
}

async fn sync_with_status(
    state: &AppState,
    operation_id: Uuid,
    cancellation_token: &CancellationToken,
) -> Result<CollectionSnapshot, String> {
    info!("Collection sync {} started", operation_id);
    let reporter = state
        .broadcaster
        .for_operation(operation_id, OperationKind::CollectionSync);

    match state.collector.sync(&reporter, cancellation_token).await {
        Ok(snapshot) => {
            reporter.completed(format!("✅ Synced {} products.", snapshot.len()));
            Ok(snapshot)
        }
        Err(e) => {
            reporter.failed(format!("❌ Collection sync failed: {e}"));
            Err(e.to_string())
        }
    }
}

/// Snapshot items matching `query`; empty for a blank query.
pub async fn search_collection(state: &AppState, query: &str) -> Vec<CollectionItem> {
    match state.snapshots.load_collection().await {
        Ok(snapshot) => snapshot.search(query).into_iter().cloned().collect(),
        Err(e) => {
            warn!("Failed to load collection snapshot: {}", e);
            Vec::new()
        }
    }
}
