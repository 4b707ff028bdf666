mod file;
mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// A single durable key-value slot holding the serialized snapshot record.
///
/// Backends store the record verbatim; encoding and decoding stay with the
/// caller so every backend shares the same lenient decoding rules.
pub trait SnapshotStore: Send + Sync {
    /// Key of the slot, e.g. `kk-game-v2`.
    fn key(&self) -> &str;
    /// Read the raw record, `None` when nothing has been written yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Overwrite the slot with `record`.
    fn save(&self, record: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the slot can currently be written.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
