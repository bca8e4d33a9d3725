//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::adapters::realtime::BroadcastDelivery;
use crate::config::Config;
use skill_exchange_core::matching::MatchService;
use skill_exchange_core::ports::{PresenceTracker, ProfileStore};
use skill_exchange_core::SessionManager;

/// The shared application state, created once at startup and passed to all
/// handlers.
pub struct AppState {
    pub profiles: Arc<dyn ProfileStore>,
    pub sessions: Arc<SessionManager>,
    pub matcher: MatchService,
    pub presence: Arc<dyn PresenceTracker>,
    /// Kept concrete so socket tasks can subscribe to the event stream.
    pub events: Arc<BroadcastDelivery>,
    pub config: Arc<Config>,
}
