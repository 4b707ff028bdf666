use std::time::Duration;

use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::state::SharedState;

const MAX_DELAY: Duration = Duration::from_secs(10);

/// Poll the durable slot and apply snapshots written by other replicas.
///
/// This is how a replica notices changes when the bus cannot reach it (a
/// different process on the same device) and how it recovers after lagging
/// on the bus. Failed polls back off exponentially up to [`MAX_DELAY`] and
/// keep the replica in degraded mode until the slot is readable again.
pub async fn run(replica: SharedState, interval: Duration) {
    let mut delay = interval;
    let mut failing = false;

    loop {
        match replica.poll_storage().await {
            Ok(applied) => {
                if failing {
                    info!("snapshot slot readable again; leaving degraded mode");
                    failing = false;
                }
                if applied {
                    debug!("applied snapshot from storage");
                }
                delay = interval;
            }
            Err(err) => {
                if failing {
                    debug!(error = %err, "snapshot slot still unavailable");
                } else {
                    warn!(error = %err, "snapshot slot unavailable; continuing over the bus");
                    failing = true;
                }
                delay = (delay * 2).min(MAX_DELAY.max(interval));
            }
        }

        sleep(delay).await;
    }
}

/// Spawn [`run`] when the replica has a store to watch.
pub fn spawn(replica: SharedState, interval: Duration) -> Option<JoinHandle<()>> {
    replica.store()?;
    Some(tokio::spawn(run(replica, interval)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        dao::snapshot_store::MemorySnapshotStore,
        state::{Action, Replica, Role, game::TeamId},
    };

    #[tokio::test]
    async fn display_picks_up_host_writes_without_a_bus() {
        let store = MemorySnapshotStore::new("kk-game-v2");
        let host = Replica::builder(Role::Host)
            .with_store(Arc::new(store.clone()))
            .build();
        let display = Replica::builder(Role::Display)
            .with_store(Arc::new(store))
            .build();
        let handle = spawn(display.clone(), Duration::from_millis(5)).unwrap();

        host.dispatch(Action::Award(TeamId::B)).await;
        host.dispatch(Action::SetTitle("Finals".into())).await;

        timeout(Duration::from_secs(2), async {
            while display.current().await.title != "Finals" {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        handle.abort();
    }

    #[tokio::test]
    async fn unreadable_slot_marks_the_replica_degraded() {
        let store = MemorySnapshotStore::new("kk-game-v2");
        store.set_available(false);
        let display = Replica::builder(Role::Display)
            .with_store(Arc::new(store.clone()))
            .build();
        let handle = spawn(display.clone(), Duration::from_millis(5)).unwrap();

        timeout(Duration::from_secs(2), async {
            while !display.is_degraded() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        store.set_available(true);
        timeout(Duration::from_secs(2), async {
            while display.is_degraded() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        handle.abort();
    }

    #[tokio::test]
    async fn nothing_to_watch_without_a_store() {
        let replica = Replica::builder(Role::Display).build();
        assert!(spawn(replica, Duration::from_millis(5)).is_none());
    }
}
