//! crates/skill_exchange_core/src/ports.rs
//!
//! Defines the collaborator contracts (traits) for the core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to stay independent of the HTTP layer, the database, and the
//! real-time transport that implement them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Profile, ProfileUpdate, Session, SessionEvent, SessionStatus};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The error taxonomy shared by all port operations and core services.
///
/// Every variant is a terminal, locally-detected condition returned to the
/// immediate caller; nothing here is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Complete your profile first")]
    ProfileRequired,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Collaborator Ports (Traits)
//=========================================================================================

/// Persistence for user profiles, with the owner's reputation fields joined
/// in. One profile per user, upserted by its owner, never deleted.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    /// Every profile except the given user's own, candidates for matching.
    async fn list_other_profiles(&self, exclude_user_id: Uuid) -> PortResult<Vec<Profile>>;

    async fn upsert_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile>;
}

/// Persistence for session aggregates. The lifecycle manager owns all
/// validation; the store only reads and writes whole records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> PortResult<Session>;

    async fn get_session(&self, id: Uuid) -> PortResult<Session>;

    async fn save_session(&self, session: &Session) -> PortResult<()>;

    /// Sessions where the user is instructor or learner, restricted to the
    /// given statuses, sorted by creation time descending.
    async fn list_sessions_for_user(
        &self,
        user_id: Uuid,
        statuses: &[SessionStatus],
    ) -> PortResult<Vec<Session>>;
}

/// Fan-out of committed session mutations to connected participants.
///
/// Publishing is fire-and-forget: a lost broadcast must not fail a committed
/// transition, and the implementation owns its connections and failures.
#[async_trait]
pub trait RealtimeDelivery: Send + Sync {
    async fn publish(&self, event: SessionEvent);
}

/// Explicit presence tracking keyed by session and user, with join/leave
/// events. Replaces any notion of a global connected-users registry.
#[async_trait]
pub trait PresenceTracker: Send + Sync {
    async fn joined(&self, session_id: Uuid, user_id: Uuid);

    async fn left(&self, session_id: Uuid, user_id: Uuid);

    async fn participants(&self, session_id: Uuid) -> Vec<Uuid>;
}
