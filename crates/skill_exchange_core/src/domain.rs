//! crates/skill_exchange_core/src/domain.rs
//!
//! Defines the pure, core data structures for the platform.
//! These structs are independent of any database or transport format;
//! the serde names are the canonical cross-boundary vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a profile bio, in characters.
pub const MAX_BIO_LEN: usize = 500;

/// Default scheduled length of a session, in minutes.
pub const DEFAULT_SCHEDULED_MINUTES: u32 = 60;

/// Upper bound on a session's scheduled length: one day, in minutes.
pub const MAX_SCHEDULED_MINUTES: u32 = 24 * 60;

/// When a user can hold sessions. Matched exactly; no partial credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Morning,
    Afternoon,
    Evenings,
    Weekends,
    Flexible,
}

impl Default for Availability {
    fn default() -> Self {
        Availability::Evenings
    }
}

/// A user's overall proficiency, ordered from Beginner to Expert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    /// Position in the Beginner..Expert ordering, used for level compatibility.
    pub fn ordinal(self) -> i64 {
        self as i64
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        SkillLevel::Intermediate
    }
}

/// A user's declared teaching/learning preferences, used for matching.
///
/// At most one profile exists per user. The reputation fields (`rating`,
/// `tokens`) live on the owning user and are joined in by the profile store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub skills_offer: Vec<String>,
    pub skills_learn: Vec<String>,
    pub availability: Availability,
    pub level: SkillLevel,
    pub bio: String,
    /// Owner's rating, 1-5. None when the user has never been rated.
    pub rating: Option<f64>,
    /// Owner's token balance, non-negative.
    pub tokens: Option<i64>,
}

/// Typed, boundary-validated input for the profile upsert. Every field is
/// optional; missing fields fall back to the platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub skills_offer: Option<Vec<String>>,
    pub skills_learn: Option<Vec<String>>,
    pub availability: Option<Availability>,
    pub level: Option<SkillLevel>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Normalizes and validates the update before it reaches a store.
    ///
    /// Skill names are trimmed and empty entries dropped; the bio must fit
    /// within [`MAX_BIO_LEN`] characters.
    pub fn validated(self) -> Result<Self, String> {
        let clean = |skills: Option<Vec<String>>| {
            skills.map(|list| {
                list.into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
        };
        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(format!("bio exceeds {} characters", MAX_BIO_LEN));
            }
        }
        Ok(Self {
            skills_offer: clean(self.skills_offer),
            skills_learn: clean(self.skills_learn),
            ..self
        })
    }
}

/// Difficulty tier of the skill taught in a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl Default for SkillTier {
    fn default() -> Self {
        SkillTier::Beginner
    }
}

/// The skill a session teaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub level: SkillTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Video,
    Audio,
    Chat,
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Video
    }
}

/// Session state machine: pending -> active -> completed, with
/// pending -> cancelled as the abort path. Completed and cancelled are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

/// One chat line inside a session. Append-only, ordered by arrival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Uuid,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// One note taken during a session. Append-only, owned by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub author: Uuid,
    pub title: String,
    pub content: String,
    pub video_time: String,
    pub tags: Vec<String>,
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
}

/// A single feedback entry left by one side of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub rating: u8,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

/// Feedback slots keyed by role. At most one entry per side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFeedback {
    pub instructor_feedback: Option<Feedback>,
    pub learner_feedback: Option<Feedback>,
}

/// One teaching/learning engagement between an instructor and a learner.
///
/// Chat messages and notes are embedded sub-documents owned by the session;
/// they are never referenced from outside the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub instructor: Uuid,
    /// Unset until a learner joins.
    pub learner: Option<Uuid>,
    pub skill: Skill,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub scheduled_minutes: u32,
    /// Settled when the session completes; stays 0 otherwise.
    pub tokens_exchanged: u32,
    pub chat_messages: Vec<ChatMessage>,
    pub notes: Vec<Note>,
    pub feedback: SessionFeedback,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether `user` is the instructor or the (joined) learner.
    pub fn is_participant(&self, user: Uuid) -> bool {
        self.instructor == user || self.learner == Some(user)
    }

    /// Minutes actually spent, rounded, derived from start/end times.
    /// None until both timestamps are set. Computed on read, never stored.
    pub fn actual_minutes(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                let secs = (end - start).num_seconds();
                Some((secs as f64 / 60.0).round() as i64)
            }
            _ => None,
        }
    }
}

/// Output events emitted after a committed mutation, for the real-time
/// delivery collaborator to broadcast to connected participants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        session_id: Uuid,
        status: SessionStatus,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        session_id: Uuid,
        message: ChatMessage,
    },
    #[serde(rename_all = "camelCase")]
    NoteAdded { session_id: Uuid, note: Note },
}

impl SessionEvent {
    /// The session this event belongs to, used for per-session fan-out.
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::StatusChanged { session_id, .. }
            | SessionEvent::ChatMessage { session_id, .. }
            | SessionEvent::NoteAdded { session_id, .. } => *session_id,
        }
    }
}
