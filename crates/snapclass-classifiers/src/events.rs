//! Notification fan-out
//!
//! Status transitions and classification outcomes are pushed to every
//! subscriber over a bounded broadcast channel. A subscriber that falls more
//! than `capacity` notifications behind skips the oldest ones and sees
//! `RecvError::Lagged`; publishers never wait.

use snapclass_core::Notification;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcasts [`Notification`]s to the presentation layer
pub struct EventBus {
    sender: broadcast::Sender<Notification>,
    capacity: usize,
}

impl EventBus {
    /// Bus buffering up to `capacity` notifications per subscriber (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers, returning how many it reached.
    ///
    /// With nobody listening the notification is dropped.
    pub fn publish(&self, notification: Notification) -> usize {
        trace!(%notification, "Publishing notification");
        self.sender.send(notification).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
