//! Enrichment commands: resolve keys, manage the registry credential

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::state::AppState;
use crate::domain::EnrichedSet;

pub async fn resolve(
    state: &AppState,
    key: &str,
    cancellation_token: &CancellationToken,
) -> Option<EnrichedSet> {
    state.resolver.resolve(key, cancellation_token).await
}

/// Results in the order of `keys`.
pub async fn resolve_many(
    state: &AppState,
    keys: &[String],
    cancellation_token: &CancellationToken,
) -> Vec<Option<EnrichedSet>> {
    state.resolver.resolve_many(keys, cancellation_token).await
}

/// Stores the registry credential; a blank value clears it.
pub async fn set_credential(state: &AppState, value: &str) -> Result<(), String> {
    state
        .credentials
        .set(value)
        .await
        .map_err(|e| format!("Failed to store credential: {e}"))
}

pub async fn clear_credential(state: &AppState) -> Result<(), String> {
    info!("Clearing registry credential");
    state
        .credentials
        .clear()
        .await
        .map_err(|e| format!("Failed to clear credential: {e}"))
}
