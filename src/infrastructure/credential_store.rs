//! Registry credential, persisted and mirrored in memory
//!
//! The resolver reads the in-memory copy on every call, so setting or
//! clearing the credential takes effect without a restart.

use std::sync::RwLock;

use tracing::info;

use super::errors::StorageError;
use super::key_value_store::{Storage, keys};

pub struct CredentialStore {
    storage: Storage,
    current: RwLock<Option<String>>,
}

impl CredentialStore {
    /// Loads the persisted credential (if any).
    pub async fn load(storage: Storage) -> Result<Self, StorageError> {
        let stored: Option<String> = storage.get_json(keys::REGISTRY_CREDENTIAL).await?;
        Ok(Self {
            storage,
            current: RwLock::new(stored.and_then(|value| normalize(&value))),
        })
    }

    /// Store that only lives in memory (nothing persisted yet).
    pub fn ephemeral(storage: Storage, credential: Option<&str>) -> Self {
        Self {
            storage,
            current: RwLock::new(credential.and_then(normalize)),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .read()
            .map(|current| current.clone())
            .unwrap_or_default()
    }

    pub fn is_configured(&self) -> bool {
        self.current().is_some()
    }

    /// Persists `value`; a blank value clears the credential.
    pub async fn set(&self, value: &str) -> Result<(), StorageError> {
        match normalize(value) {
            Some(credential) => {
                self.storage
                    .put_json(keys::REGISTRY_CREDENTIAL, &credential)
                    .await?;
                self.replace(Some(credential));
                info!("Registry credential updated");
            }
            None => self.clear().await?,
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::REGISTRY_CREDENTIAL).await?;
        self.replace(None);
        info!("Registry credential removed; running in cache-only mode");
        Ok(())
    }

    /// Overrides the in-memory credential for this process only.
    pub fn override_for_session(&self, value: &str) {
        self.replace(normalize(value));
    }

    fn replace(&self, value: Option<String>) {
        if let Ok(mut current) = self.current.write() {
            *current = value;
        }
    }
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_persists_and_reload_sees_it() {
        let storage = Storage::in_memory();
        let store = CredentialStore::load(storage.clone()).await.unwrap();
        assert!(!store.is_configured());

        store.set("  abc123  ").await.unwrap();
        assert_eq!(store.current().as_deref(), Some("abc123"));

        let reloaded = CredentialStore::load(storage).await.unwrap();
        assert_eq!(reloaded.current().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn blank_value_clears() {
        let storage = Storage::in_memory();
        let store = CredentialStore::load(storage.clone()).await.unwrap();
        store.set("abc").await.unwrap();
        store.set("   ").await.unwrap();

        assert!(store.current().is_none());
        assert!(CredentialStore::load(storage).await.unwrap().current().is_none());
    }

    #[test]
    fn session_override_is_not_persisted() {
        let store = CredentialStore::ephemeral(Storage::in_memory(), None);
        store.override_for_session("temp");
        assert!(store.is_configured());
    }
}
