//! Bus intake: feeds messages published by other replicas into the local one.

use tokio::{
    sync::broadcast::{Receiver, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{dao::models::BusMessage, state::SharedState};

/// Start forwarding bus traffic into `replica`.
///
/// Returns `None` when the replica runs without a bus; it then relies on the
/// storage watcher alone. The receiver is created before the task is spawned
/// so nothing published after this call is missed.
pub fn spawn_bus_intake(replica: SharedState) -> Option<JoinHandle<()>> {
    let receiver = replica.bus()?.subscribe();
    Some(tokio::spawn(run(replica, receiver)))
}

async fn run(replica: SharedState, mut receiver: Receiver<BusMessage>) {
    loop {
        match receiver.recv().await {
            Ok(message) => {
                let origin = message.origin();
                if replica.apply_remote(message).await {
                    debug!(%origin, "applied bus message");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                // The next state message carries the full snapshot, so skipping is safe.
                warn!(skipped, "bus intake lagged; waiting for the next snapshot");
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!(origin = %replica.origin(), "bus closed; intake stopped");
}
