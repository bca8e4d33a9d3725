//! services/api/src/adapters/presence.rs
//!
//! In-memory implementation of the `PresenceTracker` port: who is currently
//! connected to which session, keyed by session and user id with explicit
//! join/leave events.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use skill_exchange_core::ports::PresenceTracker;

#[derive(Default)]
pub struct InMemoryPresence {
    connected: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

#[async_trait]
impl PresenceTracker for InMemoryPresence {
    async fn joined(&self, session_id: Uuid, user_id: Uuid) {
        self.connected
            .write()
            .await
            .entry(session_id)
            .or_default()
            .insert(user_id);
    }

    async fn left(&self, session_id: Uuid, user_id: Uuid) {
        let mut connected = self.connected.write().await;
        if let Some(users) = connected.get_mut(&session_id) {
            users.remove(&user_id);
            if users.is_empty() {
                connected.remove(&session_id);
            }
        }
    }

    async fn participants(&self, session_id: Uuid) -> Vec<Uuid> {
        self.connected
            .read()
            .await
            .get(&session_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }
}
