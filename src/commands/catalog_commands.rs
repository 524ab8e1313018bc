//! Catalog commands: refresh, lookup and first-run bootstrap

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::state::AppState;
use crate::domain::{CatalogEntry, OperationKind};

use super::CommandAck;

/// Starts a catalog refresh in the background.
///
/// Progress and the final outcome arrive as status events tagged with the
/// returned operation id.
pub fn refresh_catalog(state: &Arc<AppState>) -> CommandAck {
    let Some(active) = state.operations.try_begin(OperationKind::CatalogRefresh) else {
        return CommandAck::already_running(OperationKind::CatalogRefresh);
    };

    let operation_id = Uuid::new_v4();
    let cancellation_token = state.resolver.session().shutdown_token().child_token();
    let task_state = Arc::clone(state);
    tokio::spawn(async move {
        let _active = active;
        let _ = refresh_with_status(&task_state, operation_id, &cancellation_token).await;
    });

    CommandAck::accepted(operation_id, OperationKind::CatalogRefresh)
}

/// Refreshes the catalog and waits; returns the number of entries stored.
pub async fn run_refresh_catalog(
    state: &AppState,
    cancellation_token: &CancellationToken,
) -> Result<usize, String> {
    let Some(_active) = state.operations.try_begin(OperationKind::CatalogRefresh) else {
        return Err(CommandAck::already_running(OperationKind::CatalogRefresh).message);
    };
    refresh_with_status(state, Uuid::new_v4(), cancellation_token).await
}

async fn refresh_with_status(
    state: &AppState,
    operation_id: Uuid,
    cancellation_token: &CancellationToken,
) -> Result<usize, String> {
    info!("Catalog refresh {} started", operation_id);
    let reporter = state
        .broadcaster
        .for_operation(operation_id, OperationKind::CatalogRefresh);

    match state.refresher.refresh(&reporter, cancellation_token).await {
        Ok(catalog) => {
            reporter.completed(format!("✅ Catalog ready ({} sets).", catalog.len()));
            Ok(catalog.len())
        }
        Err(e) => {
            reporter.failed(format!("❌ Catalog refresh failed: {e}"));
            Err(e.to_string())
        }
    }
}

/// Catalog entry for `catalog_id` from the stored snapshot.
pub async fn lookup(state: &AppState, catalog_id: &str) -> Option<CatalogEntry> {
    let catalog_id = catalog_id.trim();
    if catalog_id.is_empty() {
        return None;
    }
    match state.snapshots.lookup_catalog_entry(catalog_id).await {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Catalog lookup for {} failed: {}", catalog_id, e);
            None
        }
    }
}

/// First-run catalog build.
///
/// Returns `Ok(true)` when a refresh ran, `Ok(false)` when the initial sync
/// was already done. The flag is only set after a successful refresh.
pub async fn bootstrap(
    state: &AppState,
    cancellation_token: &CancellationToken,
) -> Result<bool, String> {
    if state
        .snapshots
        .initial_sync_done()
        .await
        .map_err(|e| e.to_string())?
    {
        return Ok(false);
    }

    info!("No initial catalog yet; building it now");
    run_refresh_catalog(state, cancellation_token).await?;
    state
        .snapshots
        .mark_initial_sync_done()
        .await
        .map_err(|e| e.to_string())?;
    Ok(true)
}
