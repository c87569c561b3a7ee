//! Notification fan-out infrastructure.
//!
//! Wraps a tokio broadcast channel so a single publisher can push a
//! [`NotificationRecord`] to every connected WebSocket client. Delivery is
//! fire-and-forget: no acknowledgment is awaited, nothing is buffered for
//! clients that connect later, and slow subscribers that fall behind the
//! channel capacity observe a `Lagged` error and skip the missed records.

use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::types::NotificationRecord;

/// Default channel capacity before slow subscribers start missing records.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Central fan-out hub for broadcasting notifications to subscribers.
///
/// `NotificationBroadcaster` is `Clone`, `Send`, and `Sync`; clones share
/// the underlying channel, so any clone may publish and all subscribers see
/// the same stream.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use tasty_server::broadcast::NotificationBroadcaster;
/// use tasty_server::types::NotificationRecord;
///
/// let broadcaster = NotificationBroadcaster::new();
/// let _rx = broadcaster.subscribe();
///
/// let record = NotificationRecord::new("hello", HashMap::new());
/// assert_eq!(broadcaster.broadcast(record), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NotificationBroadcaster {
    sender: Sender<NotificationRecord>,
}

impl NotificationBroadcaster {
    /// Creates a broadcaster with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a broadcaster with the specified channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        debug!(capacity, "Created notification broadcaster");
        Self { sender }
    }

    /// Subscribes to receive notifications broadcast after this call.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<NotificationRecord> {
        let rx = self.sender.subscribe();
        debug!(
            subscriber_count = self.subscriber_count(),
            "New subscriber added"
        );
        rx
    }

    /// Broadcasts a record to all current subscribers.
    ///
    /// Returns the number of subscribers that received the record, or 0 if
    /// there are none. Never blocks.
    pub fn broadcast(&self, record: NotificationRecord) -> usize {
        trace!(message = %record.message, "Broadcasting notification");

        match self.sender.send(record) {
            Ok(receivers) => {
                trace!(receivers, "Notification broadcast successful");
                receivers
            }
            Err(_) => {
                // No active receivers
                warn!("No connected clients to receive notification");
                0
            }
        }
    }

    /// Returns the current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
