//! Replicated game state: the model, its reducer, and the [`Replica`] that
//! owns one copy of it and keeps it in step with the other replicas.

pub mod action;
pub mod bank;
pub mod bus;
pub mod game;
pub mod subscriptions;
mod writer;

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dao::{
    models::{BusMessage, Cue, SNAPSHOT_FORMAT, SnapshotEnvelope},
    snapshot_store::SnapshotStore,
    storage::StorageResult,
};

pub use self::action::Action;
pub use self::bus::Bus;
pub use self::subscriptions::{ChangeSource, ReplicaEvent, SubscriptionId};
use self::{
    game::GameState,
    game::Round,
    subscriptions::SubscriptionRegistry,
    writer::{SnapshotWriter, set_flag},
};

/// Replica handle shared by routes and background tasks.
pub type SharedState = Arc<Replica>;
/// Upper bound on a single snapshot write unless configured otherwise.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(2);

/// Part a replica plays in the show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Control surface: the only replica expected to dispatch actions.
    Host,
    /// Audience view: mirrors whatever the host publishes.
    Display,
}

/// One running copy of the game state plus its replication adapters.
///
/// Local actions go through [`Replica::dispatch`], which runs the reducer,
/// publishes on the bus, notifies subscribers and queues the durable write.
/// Snapshots from other replicas enter through [`Replica::apply_remote`] or
/// [`Replica::poll_storage`] and overwrite the local state wholesale.
/// Messages are filtered by provenance: a replica drops anything it
/// originated and any snapshot not newer than the last one applied from the
/// same origin.
pub struct Replica {
    origin: Uuid,
    role: Role,
    game: RwLock<Arc<GameState>>,
    // Serializes dispatch and intake; holds the local sequence counter.
    dispatch_gate: Mutex<u64>,
    applied: DashMap<Uuid, u64>,
    store: Option<Arc<dyn SnapshotStore>>,
    bus: Option<Bus>,
    subscriptions: SubscriptionRegistry,
    catalog: Vec<Round>,
    degraded: Arc<watch::Sender<bool>>,
    storage_timeout: Option<Duration>,
    writer: OnceLock<SnapshotWriter>,
}

/// Step-by-step construction of a [`Replica`].
pub struct ReplicaBuilder {
    role: Role,
    initial: GameState,
    store: Option<Arc<dyn SnapshotStore>>,
    bus: Option<Bus>,
    catalog: Vec<Round>,
    storage_timeout: Option<Duration>,
}

impl ReplicaBuilder {
    /// State the replica starts from before any hydration.
    pub fn with_initial_state(mut self, state: GameState) -> Self {
        self.initial = state;
        self
    }

    /// Durable slot used for persistence and polling.
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Broadcast bus. Without one the replica only propagates through storage.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Rounds the host can load by index.
    pub fn with_catalog(mut self, catalog: Vec<Round>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Upper bound on a snapshot write; `None` waits indefinitely.
    pub fn with_storage_timeout(mut self, limit: Option<Duration>) -> Self {
        self.storage_timeout = limit;
        self
    }

    /// Finish construction with a fresh origin identifier.
    pub fn build(self) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(self.store.is_none());
        Arc::new(Replica {
            origin: Uuid::new_v4(),
            role: self.role,
            game: RwLock::new(Arc::new(self.initial.normalized())),
            dispatch_gate: Mutex::new(0),
            applied: DashMap::new(),
            store: self.store,
            bus: self.bus,
            subscriptions: SubscriptionRegistry::new(),
            catalog: self.catalog,
            degraded: Arc::new(degraded_tx),
            storage_timeout: self.storage_timeout,
            writer: OnceLock::new(),
        })
    }
}

impl Replica {
    /// Start building a replica playing `role`.
    pub fn builder(role: Role) -> ReplicaBuilder {
        ReplicaBuilder {
            role,
            initial: GameState::default(),
            store: None,
            bus: None,
            catalog: Vec::new(),
            storage_timeout: Some(DEFAULT_STORAGE_TIMEOUT),
        }
    }

    /// Identifier stamped on everything this replica publishes.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Role this replica was started with.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Rounds available to load.
    pub fn catalog(&self) -> &[Round] {
        &self.catalog
    }

    /// Bus handle, when broadcast is available.
    pub fn bus(&self) -> Option<&Bus> {
        self.bus.as_ref()
    }

    /// Durable slot handle, when one is configured.
    pub fn store(&self) -> Option<Arc<dyn SnapshotStore>> {
        self.store.clone()
    }

    /// Current state.
    pub async fn current(&self) -> Arc<GameState> {
        self.game.read().await.clone()
    }

    /// Whether the last storage interaction failed (or no storage is configured).
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Run `action` against the local state and propagate the result.
    ///
    /// Never fails and never waits on storage: the durable write runs in the
    /// background after the bus and subscribers have seen the change. An
    /// action that leaves the state unchanged is not propagated and notifies
    /// nobody.
    pub async fn dispatch(&self, action: Action) -> Arc<GameState> {
        let mut seq = self.dispatch_gate.lock().await;
        let current = self.current().await;
        let next = action.apply(&current);
        if next == *current {
            debug!(action = action.name(), "action left state unchanged");
            return current;
        }

        *seq += 1;
        let next = Arc::new(next);
        *self.game.write().await = next.clone();
        debug!(action = action.name(), seq = *seq, "applied local action");

        let cue = action.cue().map(Cue::now);
        let envelope = SnapshotEnvelope {
            format: SNAPSHOT_FORMAT,
            origin: self.origin,
            seq: *seq,
            state: GameState::clone(&*next),
        };
        self.publish(&envelope, cue.clone());

        self.subscriptions.notify(&ReplicaEvent::StateChanged {
            state: next.clone(),
            source: ChangeSource::Local,
        });
        if let Some(cue) = cue {
            self.subscriptions.notify(&ReplicaEvent::Cue {
                cue,
                source: ChangeSource::Local,
            });
        }

        self.persist(envelope);
        drop(seq);
        next
    }

    /// Wait until every snapshot dispatched so far has been handed to storage.
    ///
    /// Write failures count as handled; they only show up in [`Replica::is_degraded`].
    pub async fn flush(&self) {
        let seq = *self.dispatch_gate.lock().await;
        if let Some(writer) = self.writer.get() {
            writer.flush(seq).await;
        }
    }

    /// Apply a message received from the bus. Returns whether it changed anything.
    pub async fn apply_remote(&self, message: BusMessage) -> bool {
        match message {
            BusMessage::State {
                origin,
                seq,
                snapshot,
            } => self.apply_snapshot(origin, seq, snapshot).await,
            BusMessage::Event { origin, cue } => {
                if origin == self.origin {
                    return false;
                }
                self.subscriptions.notify(&ReplicaEvent::Cue {
                    cue,
                    source: ChangeSource::Remote,
                });
                true
            }
        }
    }

    /// Read the durable slot and apply it if it holds a snapshot this replica has not seen.
    ///
    /// An undecodable record is logged and skipped; only backend failures are returned.
    pub async fn poll_storage(&self) -> StorageResult<bool> {
        let Some(store) = self.store.clone() else {
            return Ok(false);
        };

        let outcome = store.load().await;
        self.update_degraded(outcome.is_err());
        let Some(raw) = outcome? else {
            return Ok(false);
        };

        match SnapshotEnvelope::from_json(&raw) {
            Ok(envelope) => Ok(self
                .apply_snapshot(envelope.origin, envelope.seq, envelope.state)
                .await),
            Err(err) => {
                warn!(key = store.key(), error = %err, "ignoring undecodable snapshot record");
                Ok(false)
            }
        }
    }

    /// Load the durable snapshot at startup.
    pub async fn hydrate(&self) {
        match self.poll_storage().await {
            Ok(true) => info!(origin = %self.origin, "hydrated from durable snapshot"),
            Ok(false) => info!(origin = %self.origin, "no durable snapshot to hydrate from"),
            Err(err) => warn!(error = %err, "durable snapshot unavailable; starting fresh"),
        }
    }

    /// Register `listener` and immediately hand it the current state.
    pub async fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ReplicaEvent) + Send + Sync + 'static,
    {
        let _gate = self.dispatch_gate.lock().await;
        let current = self.current().await;
        listener(&ReplicaEvent::StateChanged {
            state: current,
            source: ChangeSource::Local,
        });
        self.subscriptions.register(listener)
    }

    /// Remove a listener registered with [`Replica::subscribe`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unregister(id)
    }

    /// Number of live subscribers.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    async fn apply_snapshot(&self, origin: Uuid, seq: u64, snapshot: GameState) -> bool {
        if origin == self.origin {
            return false;
        }

        let _gate = self.dispatch_gate.lock().await;
        if self.applied.get(&origin).is_some_and(|last| seq <= *last) {
            debug!(%origin, seq, "skipping snapshot already applied");
            return false;
        }
        self.applied.insert(origin, seq);

        let next = Arc::new(snapshot.normalized());
        *self.game.write().await = next.clone();
        debug!(%origin, seq, "applied remote snapshot");

        self.subscriptions.notify(&ReplicaEvent::StateChanged {
            state: next,
            source: ChangeSource::Remote,
        });
        true
    }

    fn publish(&self, envelope: &SnapshotEnvelope, cue: Option<Cue>) {
        let Some(bus) = &self.bus else {
            return;
        };
        bus.publish(envelope.clone().into());
        if let Some(cue) = cue {
            bus.publish(BusMessage::Event {
                origin: self.origin,
                cue,
            });
        }
    }

    fn persist(&self, envelope: SnapshotEnvelope) {
        let Some(store) = &self.store else {
            return;
        };
        self.writer
            .get_or_init(|| {
                SnapshotWriter::spawn(store.clone(), self.storage_timeout, self.degraded.clone())
            })
            .submit(envelope);
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        set_flag(&self.degraded, value);
    }
}
