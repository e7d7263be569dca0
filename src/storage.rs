//! Scoped slot storage backing the secret store and the token vault.
//!
//! Two scopes mirror the two persistence choices offered at sign-in:
//! - [`StorageScope::Ephemeral`]: a runtime directory, gone after the session
//! - [`StorageScope::Durable`]: an on-disk state directory that survives restarts
//!
//! Backends implement [`ScopeStore`], a small async-ready trait over plain
//! string slots. The filesystem backend wraps synchronous I/O; callers treat
//! every method as async so a networked backend can be dropped in later.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;

// ==============================
// Scopes
// ==============================

/// Where a slot lives: per-session or per-device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Cleared when the session ends; the "do not remember me" choice.
    Ephemeral,
    /// Survives restarts; the "remember me" choice.
    Durable,
}

impl StorageScope {
    /// The opposite scope, used when purging stale copies and for fallback reads.
    pub fn other(self) -> Self {
        match self {
            StorageScope::Ephemeral => StorageScope::Durable,
            StorageScope::Durable => StorageScope::Ephemeral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageScope::Ephemeral => "ephemeral",
            StorageScope::Durable => "durable",
        }
    }

    /// Ordered lookup sequence: the preferred scope first, then the other.
    /// Readers walk this list instead of hard-coding fallback branches.
    pub fn ordered_from(preferred: Self) -> [Self; 2] {
        [preferred, preferred.other()]
    }
}

impl std::fmt::Display for StorageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================
// Store trait
// ==============================

/// Minimal slot storage: named string values under a scope.
///
/// Absence is not an error; `get` returns `Ok(None)` for a missing slot and
/// `remove` of a missing slot succeeds.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    async fn get(&self, scope: StorageScope, slot: &str) -> Result<Option<String>>;
    async fn put(&self, scope: StorageScope, slot: &str, value: &str) -> Result<()>;
    async fn remove(&self, scope: StorageScope, slot: &str) -> Result<()>;
}

/// Build the default filesystem-backed store from configuration.
pub fn make_store(cfg: &ClientConfig) -> Arc<dyn ScopeStore> {
    tracing::debug!(
        ephemeral_root = %cfg.session_dir.display(),
        durable_root = %cfg.state_dir.display(),
        "Using filesystem scope store"
    );
    Arc::new(FsScopeStore::new(
        cfg.session_dir.clone(),
        cfg.state_dir.clone(),
    ))
}

// ==============================
// Filesystem backend
// ==============================

/// One file per slot, under a per-scope root directory.
pub struct FsScopeStore {
    ephemeral_root: PathBuf,
    durable_root: PathBuf,
}

impl FsScopeStore {
    pub fn new(ephemeral_root: impl Into<PathBuf>, durable_root: impl Into<PathBuf>) -> Self {
        Self {
            ephemeral_root: ephemeral_root.into(),
            durable_root: durable_root.into(),
        }
    }

    fn root(&self, scope: StorageScope) -> &Path {
        match scope {
            StorageScope::Ephemeral => &self.ephemeral_root,
            StorageScope::Durable => &self.durable_root,
        }
    }

    fn slot_path(&self, scope: StorageScope, slot: &str) -> PathBuf {
        self.root(scope).join(slot)
    }
}

#[async_trait]
impl ScopeStore for FsScopeStore {
    async fn get(&self, scope: StorageScope, slot: &str) -> Result<Option<String>> {
        let path = self.slot_path(scope, slot);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Reading slot {}", path.display())),
        }
    }

    async fn put(&self, scope: StorageScope, slot: &str, value: &str) -> Result<()> {
        let path = self.slot_path(scope, slot);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Creating scope dir {}", parent.display()))?;
        }
        std::fs::write(&path, value)
            .with_context(|| format!("Writing slot {}", path.display()))
    }

    async fn remove(&self, scope: StorageScope, slot: &str) -> Result<()> {
        let path = self.slot_path(scope, slot);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Removing slot {}", path.display())),
        }
    }
}

// ==============================
// In-memory backend (tests, embedding)
// ==============================

/// HashMap-backed store; useful for tests and hosts without a writable disk.
#[derive(Default)]
pub struct MemoryScopeStore {
    slots: std::sync::RwLock<std::collections::HashMap<(StorageScope, String), String>>,
}

impl MemoryScopeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeStore for MemoryScopeStore {
    async fn get(&self, scope: StorageScope, slot: &str) -> Result<Option<String>> {
        let slots = self.slots.read().expect("lock");
        Ok(slots.get(&(scope, slot.to_string())).cloned())
    }

    async fn put(&self, scope: StorageScope, slot: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.write().expect("lock");
        slots.insert((scope, slot.to_string()), value.to_string());
        Ok(())
    }

    async fn remove(&self, scope: StorageScope, slot: &str) -> Result<()> {
        let mut slots = self.slots.write().expect("lock");
        slots.remove(&(scope, slot.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_scope_flips() {
        assert_eq!(StorageScope::Ephemeral.other(), StorageScope::Durable);
        assert_eq!(StorageScope::Durable.other(), StorageScope::Ephemeral);
    }

    #[test]
    fn ordered_from_puts_preferred_first() {
        assert_eq!(
            StorageScope::ordered_from(StorageScope::Durable),
            [StorageScope::Durable, StorageScope::Ephemeral]
        );
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryScopeStore::new();
        assert_eq!(
            store.get(StorageScope::Ephemeral, "slot").await.unwrap(),
            None
        );

        store
            .put(StorageScope::Ephemeral, "slot", "value")
            .await
            .unwrap();
        assert_eq!(
            store.get(StorageScope::Ephemeral, "slot").await.unwrap(),
            Some("value".into())
        );
        // Scopes do not bleed into each other.
        assert_eq!(
            store.get(StorageScope::Durable, "slot").await.unwrap(),
            None
        );

        store.remove(StorageScope::Ephemeral, "slot").await.unwrap();
        assert_eq!(
            store.get(StorageScope::Ephemeral, "slot").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn fs_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsScopeStore::new(dir.path().join("session"), dir.path().join("state"));

        assert_eq!(store.get(StorageScope::Durable, "a").await.unwrap(), None);

        store.put(StorageScope::Durable, "a", "one").await.unwrap();
        store
            .put(StorageScope::Ephemeral, "a", "two")
            .await
            .unwrap();
        assert_eq!(
            store.get(StorageScope::Durable, "a").await.unwrap(),
            Some("one".into())
        );
        assert_eq!(
            store.get(StorageScope::Ephemeral, "a").await.unwrap(),
            Some("two".into())
        );

        store.remove(StorageScope::Durable, "a").await.unwrap();
        assert_eq!(store.get(StorageScope::Durable, "a").await.unwrap(), None);
        // Removing an absent slot is not an error.
        store.remove(StorageScope::Durable, "a").await.unwrap();
    }

    #[tokio::test]
    async fn fs_store_creates_roots_lazily() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session_root = dir.path().join("nested").join("session");
        let store = FsScopeStore::new(session_root.clone(), dir.path().join("state"));

        assert!(!session_root.exists());
        store
            .put(StorageScope::Ephemeral, "slot", "v")
            .await
            .unwrap();
        assert!(session_root.join("slot").is_file());
    }
}
