pub mod domain;
pub mod lifecycle;
pub mod matching;
pub mod ports;

pub use domain::{
    Availability, ChatMessage, Feedback, Note, Profile, ProfileUpdate, Session, SessionEvent,
    SessionFeedback, SessionStatus, SessionType, Skill, SkillLevel, SkillTier,
};
pub use lifecycle::{CreateSession, EndSession, FeedbackInput, NoteInput, SessionManager};
pub use matching::{compute_matches, match_score, MatchResult, MatchService};
pub use ports::{
    PortError, PortResult, PresenceTracker, ProfileStore, RealtimeDelivery, SessionStore,
};
