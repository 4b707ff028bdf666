//! In-memory snapshot slot. Clones share the same slot, which lets several
//! replicas inside one process behave as if they shared device storage.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    snapshot_store::SnapshotStore,
    storage::{StorageError, StorageResult},
};

#[derive(Debug)]
struct Slot {
    record: RwLock<Option<String>>,
    available: AtomicBool,
    quota: Option<usize>,
}

/// Volatile slot with optional size quota and an availability switch.
#[derive(Clone, Debug)]
pub struct MemorySnapshotStore {
    key: Arc<str>,
    slot: Arc<Slot>,
}

impl MemorySnapshotStore {
    /// Create an empty, unbounded slot.
    pub fn new(key: impl Into<String>) -> Self {
        Self::build(key.into(), None)
    }

    /// Create an empty slot that rejects records larger than `bytes`.
    pub fn with_quota(key: impl Into<String>, bytes: usize) -> Self {
        Self::build(key.into(), Some(bytes))
    }

    fn build(key: String, quota: Option<usize>) -> Self {
        Self {
            key: Arc::from(key),
            slot: Arc::new(Slot {
                record: RwLock::new(None),
                available: AtomicBool::new(true),
                quota,
            }),
        }
    }

    /// Simulate the backing storage disappearing or coming back.
    pub fn set_available(&self, available: bool) {
        self.slot.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.slot.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable(
                format!("slot `{}` is offline", self.key),
                std::io::Error::from(std::io::ErrorKind::NotConnected),
            ))
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            Ok(store.slot.record.read().await.clone())
        })
    }

    fn save(&self, record: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_available()?;
            if store.slot.quota.is_some_and(|limit| record.len() > limit) {
                return Err(StorageError::QuotaExceeded {
                    key: store.key.to_string(),
                });
            }
            *store.slot.record.write().await = Some(record);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_available() })
    }
}
