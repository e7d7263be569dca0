/* armoire/src/secret_store.rs

Per-scope AES-256-GCM encryption for secrets at rest.

Key design:
- One 256-bit key per storage scope, generated lazily on first use and kept
  base64-encoded under the "auth_aes_key_b64" slot of that scope.
- A key, once created for a scope, is never regenerated while it exists;
  callers that want a fresh key must clear_keys() first.
- Key material never appears in logs; only a short SHA-256 fingerprint does.

Record format:
- encrypt() output is "<nonce-b64>.<ciphertext-b64>" with standard base64
  and a fresh 96-bit nonce per call. Two encryptions of the same plaintext
  therefore never produce the same record.

Decryption:
- decrypt(payload, preferred) walks the ordered scope list
  [preferred, other]; the first scope holding key material wins and exactly
  one decryption attempt is made with it. A record encrypted under the other
  scope's key fails authentication rather than silently retrying.
- All failure modes are recoverable DecryptionError variants; callers such
  as the token vault collapse them into "no secret available".

*/

#![forbid(unsafe_code)]

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{ScopeStore, StorageScope};
use crate::util::{b64_decode, b64_encode, key_fingerprint};

/// Slot holding the base64-encoded AES key of a scope.
pub const KEY_SLOT: &str = "auth_aes_key_b64";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

// ==============================
// Errors
// ==============================

/// Failures while producing ciphertext or provisioning key material.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The AEAD primitive itself failed; this is a configuration-level fault.
    #[error("Crypto primitive unavailable: {0}")]
    CryptoUnavailable(String),
    /// The key slot of `scope` holds data that is not a valid AES-256 key.
    #[error("Key slot for {scope} scope holds unusable material")]
    UnusableKeyMaterial { scope: StorageScope },
    #[error("Scope storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}

/// Why a stored record could not be decrypted. Every variant is recoverable:
/// the caller treats the record as absent instead of crashing.
#[derive(Debug, Error)]
pub enum DecryptionError {
    #[error("Malformed payload: expected \"<nonce>.<ciphertext>\"")]
    MalformedPayload,
    #[error("No encryption key available in either scope")]
    NoKeyAvailable,
    #[error("Stored key material is unusable")]
    BadKeyMaterial,
    #[error("Authenticated decryption failed")]
    CipherFailure,
    #[error("Scope storage failure: {0}")]
    Storage(String),
}

// ==============================
// Secret store
// ==============================

/// Encrypts and decrypts strings with per-scope keys held in a [`ScopeStore`].
#[derive(Clone)]
pub struct SecretStore {
    store: Arc<dyn ScopeStore>,
}

impl SecretStore {
    pub fn new(store: Arc<dyn ScopeStore>) -> Self {
        Self { store }
    }

    /// Return the key for `scope`, creating and persisting one on first use.
    pub async fn get_or_create_key(
        &self,
        scope: StorageScope,
    ) -> Result<Vec<u8>, SecretStoreError> {
        if let Some(encoded) = self
            .store
            .get(scope, KEY_SLOT)
            .await
            .map_err(SecretStoreError::Storage)?
        {
            let key = b64_decode(&encoded)
                .ok()
                .filter(|k| k.len() == KEY_LEN)
                .ok_or(SecretStoreError::UnusableKeyMaterial { scope })?;
            return Ok(key);
        }

        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        self.store
            .put(scope, KEY_SLOT, &b64_encode(&key))
            .await
            .map_err(SecretStoreError::Storage)?;
        debug!(
            scope = %scope,
            key_fp = %key_fingerprint(&key),
            "Created encryption key"
        );
        Ok(key)
    }

    /// Encrypt `plaintext` under the key of `scope`, provisioning the key if
    /// needed. Returns the `"<nonce-b64>.<ciphertext-b64>"` record.
    pub async fn encrypt(
        &self,
        plaintext: &str,
        scope: StorageScope,
    ) -> Result<String, SecretStoreError> {
        let key = self.get_or_create_key(scope).await?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SecretStoreError::CryptoUnavailable(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SecretStoreError::CryptoUnavailable(e.to_string()))?;

        Ok(format!(
            "{}.{}",
            b64_encode(&nonce_bytes),
            b64_encode(&ciphertext)
        ))
    }

    /// Decrypt a `"<nonce-b64>.<ciphertext-b64>"` record.
    ///
    /// Key lookup order is `[preferred, other]`; the first scope that holds
    /// key material is used for the single decryption attempt.
    pub async fn decrypt(
        &self,
        payload: &str,
        preferred: StorageScope,
    ) -> Result<String, DecryptionError> {
        let (nonce_b64, ct_b64) = payload
            .split_once('.')
            .filter(|(n, c)| !n.is_empty() && !c.is_empty())
            .ok_or(DecryptionError::MalformedPayload)?;

        let nonce_bytes = b64_decode(nonce_b64).map_err(|_| DecryptionError::MalformedPayload)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(DecryptionError::MalformedPayload);
        }
        let ciphertext = b64_decode(ct_b64).map_err(|_| DecryptionError::MalformedPayload)?;

        let key = self.find_key(preferred).await?;
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|_| DecryptionError::BadKeyMaterial)?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| DecryptionError::CipherFailure)?;
        String::from_utf8(plaintext).map_err(|_| DecryptionError::CipherFailure)
    }

    /// Remove key material from both scopes. Existing records become
    /// permanently undecryptable; intended for "forget this device".
    pub async fn clear_keys(&self) {
        for scope in [StorageScope::Ephemeral, StorageScope::Durable] {
            if let Err(e) = self.store.remove(scope, KEY_SLOT).await {
                warn!(scope = %scope, error = %e, "Failed to remove encryption key");
            }
        }
    }

    /// First scope in `[preferred, other]` order that holds key material.
    async fn find_key(&self, preferred: StorageScope) -> Result<Vec<u8>, DecryptionError> {
        for scope in StorageScope::ordered_from(preferred) {
            let encoded = self
                .store
                .get(scope, KEY_SLOT)
                .await
                .map_err(|e| DecryptionError::Storage(e.to_string()))?;
            let Some(encoded) = encoded else { continue };

            let key = b64_decode(&encoded)
                .ok()
                .filter(|k| k.len() == KEY_LEN)
                .ok_or(DecryptionError::BadKeyMaterial)?;
            return Ok(key);
        }
        Err(DecryptionError::NoKeyAvailable)
    }
}
