use tokio::sync::broadcast;

use crate::dao::models::BusMessage;

/// Device-local publish/subscribe channel shared by every replica attached to it.
///
/// Cloning the bus yields another handle to the same channel. Delivery is
/// best-effort: publishing with no subscriber, or to a subscriber that lags
/// behind the channel capacity, silently drops messages.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<BusMessage>,
}

impl Bus {
    /// Construct a bus backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent messages.
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }

    /// Send a message to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, message: BusMessage) {
        let _ = self.sender.send(message);
    }
}
