//! Background persistence of snapshots.
//!
//! One task per replica owns every write to the durable slot. Dispatch hands
//! it the newest envelope and moves on; if several envelopes are queued while
//! a write is in flight, only the latest is written, so the slot never goes
//! back to an older sequence number.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::timeout};
use tracing::warn;

use crate::dao::{models::SnapshotEnvelope, snapshot_store::SnapshotStore};

pub(crate) struct SnapshotWriter {
    queue: watch::Sender<Option<SnapshotEnvelope>>,
    written: watch::Receiver<u64>,
}

impl SnapshotWriter {
    /// Start the writer task. Must be called from within a Tokio runtime.
    pub(crate) fn spawn(
        store: Arc<dyn SnapshotStore>,
        limit: Option<Duration>,
        degraded: Arc<watch::Sender<bool>>,
    ) -> Self {
        let (queue, pending) = watch::channel(None);
        let (written_tx, written) = watch::channel(0);
        tokio::spawn(run(store, limit, degraded, pending, written_tx));
        Self { queue, written }
    }

    /// Queue `envelope`, replacing anything not yet written.
    pub(crate) fn submit(&self, envelope: SnapshotEnvelope) {
        self.queue.send_replace(Some(envelope));
    }

    /// Wait until the write for `seq` (or a later one) has been attempted.
    pub(crate) async fn flush(&self, seq: u64) {
        let mut written = self.written.clone();
        let _ = written.wait_for(|done| *done >= seq).await;
    }
}

async fn run(
    store: Arc<dyn SnapshotStore>,
    limit: Option<Duration>,
    degraded: Arc<watch::Sender<bool>>,
    mut pending: watch::Receiver<Option<SnapshotEnvelope>>,
    written: watch::Sender<u64>,
) {
    while pending.changed().await.is_ok() {
        let Some(envelope) = pending.borrow_and_update().clone() else {
            continue;
        };

        let healthy = write(store.as_ref(), limit, &envelope).await;
        set_flag(&degraded, !healthy);
        written.send_replace(envelope.seq);
    }
}

async fn write(store: &dyn SnapshotStore, limit: Option<Duration>, envelope: &SnapshotEnvelope) -> bool {
    let record = match serde_json::to_string(envelope) {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, "failed to encode snapshot; skipping durable write");
            return false;
        }
    };

    let save = store.save(record);
    let outcome = match limit {
        Some(limit) => match timeout(limit, save).await {
            Ok(result) => result,
            Err(_) => {
                warn!(key = store.key(), seq = envelope.seq, "snapshot write timed out; continuing with broadcast only");
                return false;
            }
        },
        None => save.await,
    };

    match outcome {
        Ok(()) => true,
        Err(err) => {
            warn!(key = store.key(), seq = envelope.seq, error = %err, "snapshot write failed; continuing with broadcast only");
            false
        }
    }
}

/// Update `flag`, waking watchers only when the value changes.
pub(crate) fn set_flag(flag: &watch::Sender<bool>, value: bool) {
    flag.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}
