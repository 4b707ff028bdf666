//! Snapshot slot backed by a JSON file on the local disk.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::fs;

use crate::dao::{
    snapshot_store::SnapshotStore,
    storage::{StorageError, StorageResult},
};

/// Stores the slot as `<dir>/<key>.json`, replacing it atomically on save.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    key: Arc<str>,
    dir: Arc<Path>,
}

impl FileSnapshotStore {
    /// Build a store for `key` inside `dir`. Nothing touches the disk until the first call.
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            key: Arc::from(key.into()),
            dir: Arc::from(dir.into()),
        }
    }

    /// Location of the slot on disk.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", self.key))
    }

    async fn write(&self, record: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let staging = self.staging_path();
        fs::write(&staging, record).await?;
        fs::rename(&staging, self.path()).await
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let path = store.path();
            match fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(StorageError::unavailable(
                    format!("reading `{}`", path.display()),
                    err,
                )),
            }
        })
    }

    fn save(&self, record: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.write(&record).await.map_err(|err| {
                StorageError::unavailable(format!("writing `{}`", store.path().display()), err)
            })
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            fs::create_dir_all(&store.dir).await.map_err(|err| {
                StorageError::unavailable(format!("creating `{}`", store.dir.display()), err)
            })?;
            let metadata = fs::metadata(&store.dir).await.map_err(|err| {
                StorageError::unavailable(format!("inspecting `{}`", store.dir.display()), err)
            })?;
            if metadata.permissions().readonly() {
                return Err(StorageError::unavailable(
                    format!("`{}` is read-only", store.dir.display()),
                    io::Error::from(ErrorKind::PermissionDenied),
                ));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("klash-sync-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn empty_slot_loads_as_none() {
        let store = FileSnapshotStore::new(scratch_dir(), "kk-game-v2");
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load_returns_the_record() {
        let dir = scratch_dir();
        let store = FileSnapshotStore::new(&dir, "kk-game-v2");

        store.save("{\"seq\":1}".into()).await.unwrap();
        store.save("{\"seq\":2}".into()).await.unwrap();

        assert_eq!(store.load().await.unwrap().as_deref(), Some("{\"seq\":2}"));
        assert!(!store.staging_path().exists());
        assert_eq!(store.path(), dir.join("kk-game-v2.json"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn two_handles_share_the_slot() {
        let dir = scratch_dir();
        let writer = FileSnapshotStore::new(&dir, "show");
        let reader = FileSnapshotStore::new(&dir, "show");

        writer.save("hello".into()).await.unwrap();
        assert_eq!(reader.load().await.unwrap().as_deref(), Some("hello"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn unwritable_location_reports_unavailable() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let store = FileSnapshotStore::new(&blocker, "show");
        let err = store.save("x".into()).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));

        let _ = std::fs::remove_dir_all(dir);
    }
}
