use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::ServerEvent,
    state::{ReplicaEvent, SharedState, SubscriptionId},
};

const STREAM_BUFFER: usize = 32;
const CUE_BUFFER: usize = 16;

/// Subscribe a display renderer to the replica and expose it as an SSE response.
///
/// The first event is the current state; every later state change and cue
/// follows. The subscription is dropped once the client disconnects.
pub async fn open_stream(
    replica: SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = open_feed(replica, STREAM_BUFFER).await;

    let stream = ReceiverStream::new(feed).map(|payload| {
        let mut event = Event::default().data(payload.data);
        if let Some(name) = payload.event {
            event = event.event(name);
        }
        Ok(event)
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Subscribe to the replica and return a bounded feed of SSE payloads.
///
/// State changes are coalesced: while the client is slow, only the newest
/// state waits for room in the feed, so the last change always reaches it.
/// Cues are ephemeral and are dropped when their own buffer is full.
pub async fn open_feed(replica: SharedState, buffer: usize) -> mpsc::Receiver<ServerEvent> {
    let (out_tx, out_rx) = mpsc::channel(buffer.max(1));
    let (state_tx, state_rx) = watch::channel(None::<ReplicaEvent>);
    let (cue_tx, cue_rx) = mpsc::channel(CUE_BUFFER);

    let id = replica
        .subscribe(move |event: &ReplicaEvent| match event {
            ReplicaEvent::StateChanged { .. } => {
                state_tx.send_replace(Some(event.clone()));
            }
            ReplicaEvent::Cue { .. } => {
                if let Err(TrySendError::Full(_)) = cue_tx.try_send(event.clone()) {
                    warn!("SSE client lagging; dropping cue");
                }
            }
        })
        .await;
    info!(subscription = id, "SSE stream connected");

    tokio::spawn(forward(replica, id, state_rx, cue_rx, out_tx));
    out_rx
}

async fn forward(
    replica: SharedState,
    id: SubscriptionId,
    mut state_rx: watch::Receiver<Option<ReplicaEvent>>,
    mut cue_rx: mpsc::Receiver<ReplicaEvent>,
    out: mpsc::Sender<ServerEvent>,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = out.closed() => break,
            changed = state_rx.changed() => match changed {
                Ok(()) => state_rx.borrow_and_update().clone(),
                Err(_) => break,
            },
            Some(cue) = cue_rx.recv() => Some(cue),
        };
        let Some(event) = next else {
            continue;
        };

        let payload = match ServerEvent::from_replica(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to encode SSE payload");
                continue;
            }
        };
        if out.send(payload).await.is_err() {
            break;
        }
    }

    replica.unsubscribe(id);
    info!(subscription = id, "SSE stream disconnected");
}
