//! In-process observers notified after every local or remote state change.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

use crate::{dao::models::Cue, state::game::GameState};

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// An action dispatched by this replica.
    Local,
    /// A snapshot or cue received from another replica, or hydration from storage.
    Remote,
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone)]
pub enum ReplicaEvent {
    /// The replica now holds `state`.
    StateChanged {
        /// New state.
        state: Arc<GameState>,
        /// Origin of the change.
        source: ChangeSource,
    },
    /// A presentation cue fired.
    Cue {
        /// The cue.
        cue: Cue,
        /// Origin of the cue.
        source: ChangeSource,
    },
}

/// Handle returned by [`SubscriptionRegistry::register`].
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&ReplicaEvent) + Send + Sync>;

/// Registry of subscriber callbacks keyed by subscription id.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    listeners: DashMap<SubscriptionId, Listener>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener and return the id needed to remove it.
    pub fn register<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ReplicaEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener. Returns `false` when the id was unknown.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke every listener with `event`.
    ///
    /// Listeners are collected before any of them runs, so a listener may
    /// register or unregister without deadlocking the map.
    pub fn notify(&self, event: &ReplicaEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn state_event() -> ReplicaEvent {
        ReplicaEvent::StateChanged {
            state: Arc::new(GameState::default()),
            source: ChangeSource::Local,
        }
    }

    #[test]
    fn every_listener_is_notified_until_unregistered() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = seen.clone();
            registry.register(move |_| seen.lock().unwrap().push("first"))
        };
        {
            let seen = seen.clone();
            registry.register(move |_| seen.lock().unwrap().push("second"));
        }

        registry.notify(&state_event());
        assert_eq!(seen.lock().unwrap().len(), 2);

        assert!(registry.unregister(first));
        assert!(!registry.unregister(first));
        registry.notify(&state_event());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], "second");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listener_may_unregister_itself() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let slot = Arc::new(Mutex::new(None::<SubscriptionId>));

        let id = {
            let inner = registry.clone();
            let slot = slot.clone();
            registry.register(move |_| {
                if let Some(id) = slot.lock().unwrap().take() {
                    inner.unregister(id);
                }
            })
        };
        *slot.lock().unwrap() = Some(id);

        registry.notify(&state_event());
        assert!(registry.is_empty());
    }
}
