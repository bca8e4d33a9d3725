//! services/api/src/adapters/realtime.rs
//!
//! In-process implementation of the `RealtimeDelivery` port on top of a
//! tokio broadcast channel. The WebSocket layer subscribes and filters by
//! session id; publishing never blocks on slow or absent consumers.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use skill_exchange_core::domain::SessionEvent;
use skill_exchange_core::ports::RealtimeDelivery;

/// Fans committed session events out to every connected socket task.
pub struct BroadcastDelivery {
    tx: broadcast::Sender<SessionEvent>,
}

impl BroadcastDelivery {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// A fresh receiver for one socket task.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl RealtimeDelivery for BroadcastDelivery {
    async fn publish(&self, event: SessionEvent) {
        // send() only fails when nobody is subscribed, which is fine.
        if self.tx.send(event).is_err() {
            debug!("No subscribers for session event");
        }
    }
}
