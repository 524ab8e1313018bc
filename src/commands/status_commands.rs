use crate::application::state::AppState;
use crate::infrastructure::snapshot_repository::StorageStatus;

/// Snapshot timestamps and sizes plus credential presence.
pub async fn storage_status(state: &AppState) -> Result<StorageStatus, String> {
    let mut status = state
        .snapshots
        .status()
        .await
        .map_err(|e| format!("Failed to read storage status: {e}"))?;
    status.credential_configured = state.credentials.is_configured();
    Ok(status)
}
