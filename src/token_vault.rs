//! Encrypted persistence for the session bearer token.
//!
//! The vault keeps at most one token record across both scopes:
//! - `store` writes the encrypted record to the chosen scope and purges the
//!   other, so a later "remember me" change cannot leave a stale copy behind
//! - `load` never fails: any malformed, tampered or orphaned record collapses
//!   to `None` (with a warning) and the caller proceeds unauthenticated
//! - `clear` drops the records but keeps key material; `forget_device`
//!   additionally destroys the per-scope keys

use std::sync::Arc;

use tracing::{debug, warn};

use crate::secret_store::{SecretStore, SecretStoreError};
use crate::storage::{ScopeStore, StorageScope};

/// Slot holding the encrypted token record of a scope.
pub const TOKEN_SLOT: &str = "auth_token_encrypted";

/// Stores and recovers the bearer token through the [`SecretStore`].
#[derive(Clone)]
pub struct TokenVault {
    store: Arc<dyn ScopeStore>,
    secrets: SecretStore,
}

impl TokenVault {
    pub fn new(store: Arc<dyn ScopeStore>) -> Self {
        let secrets = SecretStore::new(store.clone());
        Self { store, secrets }
    }

    /// Encrypt `token` into `scope` and purge the record in the other scope.
    pub async fn store(
        &self,
        token: &str,
        scope: StorageScope,
    ) -> Result<(), SecretStoreError> {
        let record = self.secrets.encrypt(token, scope).await?;
        self.store
            .put(scope, TOKEN_SLOT, &record)
            .await
            .map_err(SecretStoreError::Storage)?;
        // Single-location invariant: the other scope must not keep a copy.
        self.store
            .remove(scope.other(), TOKEN_SLOT)
            .await
            .map_err(SecretStoreError::Storage)?;
        debug!(scope = %scope, "Stored encrypted token");
        Ok(())
    }

    /// Recover the token, trying `preferred` first and then the other scope.
    ///
    /// Decryption uses the scope the record was actually found in as its key
    /// preference. Never fails; unusable records are logged and skipped.
    pub async fn load(&self, preferred: StorageScope) -> Option<String> {
        for scope in StorageScope::ordered_from(preferred) {
            let record = match self.store.get(scope, TOKEN_SLOT).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(scope = %scope, error = %e, "Token record unreadable");
                    continue;
                }
            };
            let Some(record) = record else { continue };

            match self.secrets.decrypt(&record, scope).await {
                Ok(token) => {
                    debug!(scope = %scope, "Recovered stored token");
                    return Some(token);
                }
                Err(e) => {
                    warn!(scope = %scope, error = %e, "Stored token unusable");
                }
            }
        }
        None
    }

    /// Remove the token record from both scopes. Key material stays, so a
    /// future login can encrypt without re-provisioning keys. Best-effort.
    pub async fn clear(&self) {
        for scope in [StorageScope::Ephemeral, StorageScope::Durable] {
            if let Err(e) = self.store.remove(scope, TOKEN_SLOT).await {
                warn!(scope = %scope, error = %e, "Failed to remove token record");
            }
        }
    }

    /// `clear` plus destruction of both scope keys. Any record that somehow
    /// survives becomes permanently undecryptable.
    pub async fn forget_device(&self) {
        self.clear().await;
        self.secrets.clear_keys().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryScopeStore;

    fn vault_with_store() -> (TokenVault, Arc<MemoryScopeStore>) {
        let backing = Arc::new(MemoryScopeStore::new());
        (TokenVault::new(backing.clone()), backing)
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let (vault, _) = vault_with_store();
        vault
            .store("bearer-abc", StorageScope::Durable)
            .await
            .unwrap();
        assert_eq!(
            vault.load(StorageScope::Durable).await.as_deref(),
            Some("bearer-abc")
        );
    }

    #[tokio::test]
    async fn record_at_rest_is_not_plaintext() {
        let (vault, backing) = vault_with_store();
        vault
            .store("bearer-abc", StorageScope::Durable)
            .await
            .unwrap();

        let raw = backing
            .get(StorageScope::Durable, TOKEN_SLOT)
            .await
            .unwrap()
            .unwrap();
        assert!(!raw.contains("bearer-abc"));
        assert!(raw.contains('.'));
    }

    #[tokio::test]
    async fn store_purges_the_other_scope() {
        let (vault, backing) = vault_with_store();

        vault
            .store("first", StorageScope::Ephemeral)
            .await
            .unwrap();
        vault.store("second", StorageScope::Durable).await.unwrap();

        assert_eq!(
            backing
                .get(StorageScope::Ephemeral, TOKEN_SLOT)
                .await
                .unwrap(),
            None
        );
        assert_eq!(vault.load(StorageScope::Ephemeral).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn load_falls_back_to_other_scope() {
        let (vault, _) = vault_with_store();
        vault
            .store("durable-token", StorageScope::Durable)
            .await
            .unwrap();

        // Asking for the ephemeral scope still finds the durable record.
        assert_eq!(
            vault.load(StorageScope::Ephemeral).await.as_deref(),
            Some("durable-token")
        );
    }

    #[tokio::test]
    async fn load_of_empty_vault_is_none() {
        let (vault, _) = vault_with_store();
        assert_eq!(vault.load(StorageScope::Ephemeral).await, None);
        assert_eq!(vault.load(StorageScope::Durable).await, None);
    }

    #[tokio::test]
    async fn corrupted_record_collapses_to_none() {
        let (vault, backing) = vault_with_store();
        vault.store("token", StorageScope::Durable).await.unwrap();

        backing
            .put(StorageScope::Durable, TOKEN_SLOT, "garbage-without-dot")
            .await
            .unwrap();

        assert_eq!(vault.load(StorageScope::Durable).await, None);
    }

    #[tokio::test]
    async fn clear_removes_records_but_keeps_keys() {
        let (vault, backing) = vault_with_store();
        vault.store("token", StorageScope::Durable).await.unwrap();

        vault.clear().await;

        assert_eq!(vault.load(StorageScope::Durable).await, None);
        assert!(backing
            .get(StorageScope::Durable, crate::secret_store::KEY_SLOT)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn forget_device_removes_keys_too() {
        let (vault, backing) = vault_with_store();
        vault.store("token", StorageScope::Durable).await.unwrap();

        vault.forget_device().await;

        assert_eq!(vault.load(StorageScope::Durable).await, None);
        assert_eq!(
            backing
                .get(StorageScope::Durable, crate::secret_store::KEY_SLOT)
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            backing
                .get(StorageScope::Ephemeral, crate::secret_store::KEY_SLOT)
                .await
                .unwrap(),
            None
        );
    }
}
