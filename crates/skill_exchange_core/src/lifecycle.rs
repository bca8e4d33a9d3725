//! crates/skill_exchange_core/src/lifecycle.rs
//!
//! The session lifecycle manager: a small state machine over the `Session`
//! aggregate. Every mutation is validated here, applied as a whole-record
//! read-modify-write under a per-session lock, and announced to the
//! real-time delivery collaborator only after the store has committed it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    ChatMessage, Feedback, Note, Session, SessionEvent, SessionFeedback, SessionStatus,
    SessionType, Skill, DEFAULT_SCHEDULED_MINUTES, MAX_SCHEDULED_MINUTES,
};
use crate::ports::{PortError, PortResult, RealtimeDelivery, SessionStore};

//=========================================================================================
// Typed Operation Inputs
//=========================================================================================

/// Input for creating a new session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    pub skill: Skill,
    #[serde(default)]
    pub session_type: SessionType,
    /// Minutes; defaults to 60 when absent.
    pub scheduled_duration: Option<u32>,
}

/// Input for one note attached by a participant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    #[serde(default = "default_video_time")]
    pub video_time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_starred: bool,
}

fn default_video_time() -> String {
    "00:00".to_string()
}

/// Input for one feedback entry, routed by the caller's role.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Input for ending a session: optional closing notes, optional feedback,
/// and the token amount settled by the upstream billing glue.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSession {
    #[serde(default)]
    pub notes: Vec<NoteInput>,
    pub feedback: Option<FeedbackInput>,
    pub tokens_exchanged: Option<u32>,
}

//=========================================================================================
// SessionManager
//=========================================================================================

/// Governs all session transitions and appends.
///
/// Concurrency model: each session has its own async mutex, taken for the
/// full read-modify-write cycle of any mutation. Two `join`s racing on the
/// same pending session therefore serialize, and exactly one of them sees
/// `pending`; the other fails with `InvalidState`. A rejected operation
/// mutates nothing. The manager performs no I/O of its own beyond calling
/// the store and delivery ports.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    delivery: Arc<dyn RealtimeDelivery>,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, delivery: Arc<dyn RealtimeDelivery>) -> Self {
        Self {
            store,
            delivery,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The exclusivity lock for one session id.
    fn lock_for(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id).or_default().clone()
    }

    /// Terminal sessions can never transition again; their lock entry is
    /// dead weight and gets dropped. The same applies to entries allocated
    /// for ids that turned out not to exist.
    fn release_lock(&self, id: Uuid) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(&id);
    }

    /// Takes the session's lock, then loads it for a read-modify-write
    /// cycle.
    ///
    /// When the id does not exist the freshly allocated lock entry is
    /// removed again, so probing unknown ids cannot grow the registry. A
    /// session cannot spring into being under a probed id (ids are minted
    /// by `create`), so dropping the entry races with nothing.
    async fn lock_session(&self, id: Uuid) -> PortResult<(OwnedMutexGuard<()>, Session)> {
        let guard = self.lock_for(id).lock_owned().await;
        match self.store.get_session(id).await {
            Ok(session) => Ok((guard, session)),
            Err(e) => {
                if matches!(e, PortError::NotFound(_)) {
                    drop(guard);
                    self.release_lock(id);
                }
                Err(e)
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Transitions
    //-------------------------------------------------------------------------------------

    /// Creates a new pending session with the caller as instructor.
    pub async fn create(&self, caller: Uuid, input: CreateSession) -> PortResult<Session> {
        if input.skill.name.trim().is_empty() {
            return Err(PortError::Validation("skill name is required".into()));
        }
        let scheduled = input.scheduled_duration.unwrap_or(DEFAULT_SCHEDULED_MINUTES);
        if scheduled == 0 {
            return Err(PortError::Validation(
                "scheduled duration must be positive".into(),
            ));
        }
        if scheduled > MAX_SCHEDULED_MINUTES {
            return Err(PortError::Validation(
                "scheduled duration must not exceed 24 hours".into(),
            ));
        }

        let session = Session {
            id: Uuid::new_v4(),
            instructor: caller,
            learner: None,
            skill: input.skill,
            session_type: input.session_type,
            status: SessionStatus::Pending,
            scheduled_minutes: scheduled,
            tokens_exchanged: 0,
            chat_messages: Vec::new(),
            notes: Vec::new(),
            feedback: SessionFeedback::default(),
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
        };

        let session = self.store.insert_session(session).await?;
        self.delivery
            .publish(SessionEvent::StatusChanged {
                session_id: session.id,
                status: session.status,
            })
            .await;
        Ok(session)
    }

    /// Joins a pending session as the learner, activating it.
    pub async fn join(&self, caller: Uuid, session_id: Uuid) -> PortResult<Session> {
        let (_guard, mut session) = self.lock_session(session_id).await?;
        if session.status != SessionStatus::Pending {
            return Err(PortError::InvalidState("session is not available".into()));
        }
        if session.instructor == caller {
            return Err(PortError::InvalidState(
                "instructor cannot join their own session".into(),
            ));
        }

        session.learner = Some(caller);
        session.status = SessionStatus::Active;
        session.start_time = Some(Utc::now());
        self.store.save_session(&session).await?;

        self.delivery
            .publish(SessionEvent::StatusChanged {
                session_id: session.id,
                status: session.status,
            })
            .await;
        Ok(session)
    }

    /// Ends a session, attaching any closing notes and feedback.
    ///
    /// From `active` the session completes: end time is stamped, supplied
    /// notes are appended with the caller as author, feedback is routed to
    /// the caller's role slot, and the token amount is settled. Ending a
    /// still-pending session is the no-op cancellation path: it lands in
    /// `cancelled` with nothing attached.
    pub async fn end(
        &self,
        caller: Uuid,
        session_id: Uuid,
        input: EndSession,
    ) -> PortResult<Session> {
        let (guard, mut session) = self.lock_session(session_id).await?;
        if !session.is_participant(caller) {
            return Err(PortError::AccessDenied(
                "only session participants may end it".into(),
            ));
        }

        match session.status {
            SessionStatus::Active => {
                let now = Utc::now();
                session.status = SessionStatus::Completed;
                session.end_time = Some(now);
                session.tokens_exchanged = input.tokens_exchanged.unwrap_or(0);

                for note in input.notes {
                    session.notes.push(Note {
                        author: caller,
                        title: note.title,
                        content: note.content,
                        video_time: note.video_time,
                        tags: note.tags,
                        is_starred: note.is_starred,
                        created_at: now,
                    });
                }

                if let Some(feedback) = input.feedback {
                    let entry = validated_feedback(feedback, now)?;
                    if caller == session.instructor {
                        session.feedback.instructor_feedback = Some(entry);
                    } else {
                        session.feedback.learner_feedback = Some(entry);
                    }
                }
            }
            SessionStatus::Pending => {
                session.status = SessionStatus::Cancelled;
                session.end_time = Some(Utc::now());
            }
            _ => {
                return Err(PortError::InvalidState(
                    "session has already ended".into(),
                ));
            }
        }

        self.store.save_session(&session).await?;
        drop(guard);
        self.release_lock(session_id);

        self.delivery
            .publish(SessionEvent::StatusChanged {
                session_id: session.id,
                status: session.status,
            })
            .await;
        Ok(session)
    }

    /// Cancels a pending session. Valid only before a learner joins.
    pub async fn cancel(&self, caller: Uuid, session_id: Uuid) -> PortResult<Session> {
        let (guard, mut session) = self.lock_session(session_id).await?;
        if !session.is_participant(caller) {
            return Err(PortError::AccessDenied(
                "only session participants may cancel it".into(),
            ));
        }
        if session.status != SessionStatus::Pending {
            return Err(PortError::InvalidState(
                "only pending sessions can be cancelled".into(),
            ));
        }

        session.status = SessionStatus::Cancelled;
        session.end_time = Some(Utc::now());
        self.store.save_session(&session).await?;
        drop(guard);
        self.release_lock(session_id);

        self.delivery
            .publish(SessionEvent::StatusChanged {
                session_id: session.id,
                status: session.status,
            })
            .await;
        Ok(session)
    }

    //-------------------------------------------------------------------------------------
    // Appends
    //-------------------------------------------------------------------------------------

    /// Appends a chat message, ordered by arrival.
    pub async fn add_chat_message(
        &self,
        caller: Uuid,
        session_id: Uuid,
        message: String,
    ) -> PortResult<ChatMessage> {
        if message.trim().is_empty() {
            return Err(PortError::Validation("message must not be empty".into()));
        }

        let (_guard, mut session) = self.lock_session(session_id).await?;
        self.check_append_allowed(&session, caller, "send messages")?;

        let entry = ChatMessage {
            sender: caller,
            message,
            timestamp: Utc::now(),
        };
        session.chat_messages.push(entry.clone());
        self.store.save_session(&session).await?;

        self.delivery
            .publish(SessionEvent::ChatMessage {
                session_id,
                message: entry.clone(),
            })
            .await;
        Ok(entry)
    }

    /// Appends a note, ordered by arrival.
    pub async fn add_note(
        &self,
        caller: Uuid,
        session_id: Uuid,
        input: NoteInput,
    ) -> PortResult<Note> {
        if input.title.trim().is_empty() {
            return Err(PortError::Validation("note title is required".into()));
        }

        let (_guard, mut session) = self.lock_session(session_id).await?;
        self.check_append_allowed(&session, caller, "add notes")?;

        let note = Note {
            author: caller,
            title: input.title,
            content: input.content,
            video_time: input.video_time,
            tags: input.tags,
            is_starred: input.is_starred,
            created_at: Utc::now(),
        };
        session.notes.push(note.clone());
        self.store.save_session(&session).await?;

        self.delivery
            .publish(SessionEvent::NoteAdded {
                session_id,
                note: note.clone(),
            })
            .await;
        Ok(note)
    }

    fn check_append_allowed(
        &self,
        session: &Session,
        caller: Uuid,
        action: &str,
    ) -> PortResult<()> {
        if !session.is_participant(caller) {
            return Err(PortError::AccessDenied(format!(
                "only session participants may {action}"
            )));
        }
        if session.status.is_terminal() {
            return Err(PortError::InvalidState("session has ended".into()));
        }
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // Queries
    //-------------------------------------------------------------------------------------

    /// Sessions the user is part of that are still pending or active.
    pub async fn active_for_user(&self, user_id: Uuid) -> PortResult<Vec<Session>> {
        self.store
            .list_sessions_for_user(user_id, &[SessionStatus::Pending, SessionStatus::Active])
            .await
    }

    /// Completed sessions the user took part in, newest first.
    pub async fn history_for_user(&self, user_id: Uuid) -> PortResult<Vec<Session>> {
        self.store
            .list_sessions_for_user(user_id, &[SessionStatus::Completed])
            .await
    }

    /// Fetches one session, for read-only callers such as the socket layer.
    pub async fn get(&self, session_id: Uuid) -> PortResult<Session> {
        self.store.get_session(session_id).await
    }
}

fn validated_feedback(input: FeedbackInput, now: chrono::DateTime<Utc>) -> PortResult<Feedback> {
    if !(1..=5).contains(&input.rating) {
        return Err(PortError::Validation(
            "feedback rating must be between 1 and 5".into(),
        ));
    }
    Ok(Feedback {
        rating: input.rating,
        comment: input.comment,
        submitted_at: now,
    })
}
