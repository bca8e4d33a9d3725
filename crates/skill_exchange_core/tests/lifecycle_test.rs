//! Integration tests for the session lifecycle manager, driven by in-memory
//! implementations of the store and delivery ports.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use skill_exchange_core::domain::{Session, SessionEvent, SessionStatus, SessionType, Skill, SkillTier};
use skill_exchange_core::lifecycle::{CreateSession, EndSession, FeedbackInput, NoteInput};
use skill_exchange_core::ports::{PortError, PortResult, RealtimeDelivery, SessionStore};
use skill_exchange_core::SessionManager;

//=========================================================================================
// In-Memory Port Implementations
//=========================================================================================

#[derive(Default)]
struct MemSessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

#[async_trait]
impl SessionStore for MemSessionStore {
    async fn insert_session(&self, session: Session) -> PortResult<Session> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> PortResult<Session> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", id)))
    }

    async fn save_session(&self, session: &Session) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn list_sessions_for_user(
        &self,
        user_id: Uuid,
        statuses: &[SessionStatus],
    ) -> PortResult<Vec<Session>> {
        let mut found: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_participant(user_id) && statuses.contains(&s.status))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

/// Records every published event so tests can assert on fan-out.
#[derive(Default)]
struct RecordingDelivery {
    events: RwLock<Vec<SessionEvent>>,
}

#[async_trait]
impl RealtimeDelivery for RecordingDelivery {
    async fn publish(&self, event: SessionEvent) {
        self.events.write().await.push(event);
    }
}

fn setup() -> (Arc<SessionManager>, Arc<MemSessionStore>, Arc<RecordingDelivery>) {
    let store = Arc::new(MemSessionStore::default());
    let delivery = Arc::new(RecordingDelivery::default());
    let manager = Arc::new(SessionManager::new(store.clone(), delivery.clone()));
    (manager, store, delivery)
}

fn react_session() -> CreateSession {
    CreateSession {
        skill: Skill {
            name: "React".into(),
            category: "programming".into(),
            level: SkillTier::Beginner,
        },
        session_type: SessionType::Video,
        scheduled_duration: Some(60),
    }
}

//=========================================================================================
// Transition Tests
//=========================================================================================

#[tokio::test]
async fn create_starts_pending_with_defaults() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();

    let mut input = react_session();
    input.scheduled_duration = None;
    let session = manager.create(instructor, input).await.unwrap();

    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.instructor, instructor);
    assert_eq!(session.learner, None);
    assert_eq!(session.scheduled_minutes, 60);
    assert_eq!(session.tokens_exchanged, 0);
    assert!(session.start_time.is_none());
}

#[tokio::test]
async fn create_rejects_blank_skill_name() {
    let (manager, _, _) = setup();
    let mut input = react_session();
    input.skill.name = "   ".into();

    let err = manager.create(Uuid::new_v4(), input).await.unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));
}

#[tokio::test]
async fn join_activates_and_sets_learner() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();

    let session = manager.create(instructor, react_session()).await.unwrap();
    let joined = manager.join(learner, session.id).await.unwrap();

    assert_eq!(joined.status, SessionStatus::Active);
    assert_eq!(joined.learner, Some(learner));
    assert!(joined.start_time.is_some());
}

#[tokio::test]
async fn second_join_is_invalid_state() {
    let (manager, _, _) = setup();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();

    manager.join(Uuid::new_v4(), session.id).await.unwrap();
    let err = manager.join(Uuid::new_v4(), session.id).await.unwrap_err();
    assert!(matches!(err, PortError::InvalidState(_)));
}

#[tokio::test]
async fn instructor_cannot_join_own_session() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();

    let err = manager.join(instructor, session.id).await.unwrap_err();
    assert!(matches!(err, PortError::InvalidState(_)));
}

#[tokio::test]
async fn join_unknown_session_is_not_found() {
    let (manager, _, _) = setup();
    let err = manager
        .join(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_joins_have_exactly_one_winner() {
    let (manager, store, _) = setup();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();

    let learner_a = Uuid::new_v4();
    let learner_b = Uuid::new_v4();
    let (res_a, res_b) = tokio::join!(
        manager.join(learner_a, session.id),
        manager.join(learner_b, session.id),
    );

    let successes = [&res_a, &res_b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if res_a.is_ok() { res_b } else { res_a };
    assert!(matches!(loser.unwrap_err(), PortError::InvalidState(_)));

    let stored = store.get_session(session.id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Active);
    assert!(stored.learner == Some(learner_a) || stored.learner == Some(learner_b));
}

#[tokio::test]
async fn end_by_third_party_is_denied_and_unchanged() {
    let (manager, store, _) = setup();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();
    manager.join(Uuid::new_v4(), session.id).await.unwrap();

    let err = manager
        .end(Uuid::new_v4(), session.id, EndSession::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::AccessDenied(_)));

    let stored = store.get_session(session.id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Active);
    assert!(stored.end_time.is_none());
}

#[tokio::test]
async fn end_routes_learner_feedback_and_derives_duration() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();

    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, session.id).await.unwrap();

    let ended = manager
        .end(
            learner,
            session.id,
            EndSession {
                notes: vec![NoteInput {
                    title: "Recap".into(),
                    content: "Hooks and props".into(),
                    video_time: "00:00".into(),
                    tags: vec![],
                    is_starred: false,
                }],
                feedback: Some(FeedbackInput {
                    rating: 5,
                    comment: "great".into(),
                }),
                tokens_exchanged: Some(2),
            },
        )
        .await
        .unwrap();

    assert_eq!(ended.status, SessionStatus::Completed);
    assert!(ended.end_time.is_some());
    assert_eq!(ended.tokens_exchanged, 2);
    assert_eq!(ended.actual_minutes(), Some(0)); // started moments ago

    let feedback = ended.feedback.learner_feedback.unwrap();
    assert_eq!(feedback.rating, 5);
    assert_eq!(feedback.comment, "great");
    assert!(ended.feedback.instructor_feedback.is_none());

    assert_eq!(ended.notes.len(), 1);
    assert_eq!(ended.notes[0].author, learner);
}

#[tokio::test]
async fn end_by_instructor_fills_instructor_slot() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(Uuid::new_v4(), session.id).await.unwrap();

    let ended = manager
        .end(
            instructor,
            session.id,
            EndSession {
                feedback: Some(FeedbackInput {
                    rating: 4,
                    comment: "attentive student".into(),
                }),
                ..EndSession::default()
            },
        )
        .await
        .unwrap();

    assert!(ended.feedback.instructor_feedback.is_some());
    assert!(ended.feedback.learner_feedback.is_none());
}

#[tokio::test]
async fn large_token_settlements_are_preserved() {
    let (manager, store, _) = setup();
    let learner = Uuid::new_v4();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();
    manager.join(learner, session.id).await.unwrap();

    manager
        .end(
            learner,
            session.id,
            EndSession {
                tokens_exchanged: Some(u32::MAX),
                ..EndSession::default()
            },
        )
        .await
        .unwrap();

    let stored = store.get_session(session.id).await.unwrap();
    assert_eq!(stored.tokens_exchanged, u32::MAX);
}

#[tokio::test]
async fn end_before_join_cancels() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();

    let ended = manager
        .end(instructor, session.id, EndSession::default())
        .await
        .unwrap();
    assert_eq!(ended.status, SessionStatus::Cancelled);
    assert!(ended.feedback.instructor_feedback.is_none());
    assert_eq!(ended.tokens_exchanged, 0);
}

#[tokio::test]
async fn end_twice_is_invalid_state() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, session.id).await.unwrap();
    manager
        .end(learner, session.id, EndSession::default())
        .await
        .unwrap();

    let err = manager
        .end(instructor, session.id, EndSession::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::InvalidState(_)));
}

#[tokio::test]
async fn invalid_feedback_rating_rejects_whole_transition() {
    let (manager, store, _) = setup();
    let learner = Uuid::new_v4();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();
    manager.join(learner, session.id).await.unwrap();

    let err = manager
        .end(
            learner,
            session.id,
            EndSession {
                feedback: Some(FeedbackInput {
                    rating: 6,
                    comment: String::new(),
                }),
                ..EndSession::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));

    // Nothing committed: the session is still active and endable.
    let stored = store.get_session(session.id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Active);
    assert!(stored.end_time.is_none());
}

#[tokio::test]
async fn cancel_is_pending_only() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();

    let pending = manager.create(instructor, react_session()).await.unwrap();
    let cancelled = manager.cancel(instructor, pending.id).await.unwrap();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);

    let active = manager.create(instructor, react_session()).await.unwrap();
    manager.join(Uuid::new_v4(), active.id).await.unwrap();
    let err = manager.cancel(instructor, active.id).await.unwrap_err();
    assert!(matches!(err, PortError::InvalidState(_)));
}

#[tokio::test]
async fn cancel_by_outsider_is_denied() {
    let (manager, _, _) = setup();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();
    let err = manager.cancel(Uuid::new_v4(), session.id).await.unwrap_err();
    assert!(matches!(err, PortError::AccessDenied(_)));
}

//=========================================================================================
// Append Tests
//=========================================================================================

#[tokio::test]
async fn chat_appends_in_arrival_order() {
    let (manager, store, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, session.id).await.unwrap();

    manager
        .add_chat_message(instructor, session.id, "hello".into())
        .await
        .unwrap();
    manager
        .add_chat_message(learner, session.id, "hi there".into())
        .await
        .unwrap();

    let stored = store.get_session(session.id).await.unwrap();
    assert_eq!(stored.chat_messages.len(), 2);
    assert_eq!(stored.chat_messages[0].message, "hello");
    assert_eq!(stored.chat_messages[1].message, "hi there");
    assert!(stored.chat_messages[0].timestamp <= stored.chat_messages[1].timestamp);
}

#[tokio::test]
async fn chat_from_non_participant_is_denied() {
    let (manager, store, _) = setup();
    let session = manager
        .create(Uuid::new_v4(), react_session())
        .await
        .unwrap();

    let err = manager
        .add_chat_message(Uuid::new_v4(), session.id, "let me in".into())
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::AccessDenied(_)));

    let stored = store.get_session(session.id).await.unwrap();
    assert!(stored.chat_messages.is_empty());
}

#[tokio::test]
async fn appends_rejected_after_session_ends() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, session.id).await.unwrap();
    manager
        .end(learner, session.id, EndSession::default())
        .await
        .unwrap();

    let err = manager
        .add_chat_message(learner, session.id, "one more thing".into())
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::InvalidState(_)));
}

#[tokio::test]
async fn note_append_stamps_author_and_time() {
    let (manager, store, _) = setup();
    let instructor = Uuid::new_v4();
    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(Uuid::new_v4(), session.id).await.unwrap();

    let note = manager
        .add_note(
            instructor,
            session.id,
            NoteInput {
                title: "Key point".into(),
                content: "State lives in the component".into(),
                video_time: "12:34".into(),
                tags: vec!["react".into()],
                is_starred: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(note.author, instructor);
    assert!(note.is_starred);

    let stored = store.get_session(session.id).await.unwrap();
    assert_eq!(stored.notes.len(), 1);
    assert_eq!(stored.notes[0].video_time, "12:34");
}

//=========================================================================================
// Query and Event Tests
//=========================================================================================

#[tokio::test]
async fn active_and_history_queries_split_by_status() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();

    let first = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, first.id).await.unwrap();
    manager
        .end(learner, first.id, EndSession::default())
        .await
        .unwrap();

    let second = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, second.id).await.unwrap();

    let active = manager.active_for_user(learner).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let history = manager.history_for_user(learner).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, first.id);
}

#[tokio::test]
async fn history_is_newest_first() {
    let (manager, _, _) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let session = manager.create(instructor, react_session()).await.unwrap();
        manager.join(learner, session.id).await.unwrap();
        manager
            .end(learner, session.id, EndSession::default())
            .await
            .unwrap();
        ids.push(session.id);
    }

    let history = manager.history_for_user(instructor).await.unwrap();
    let listed: Vec<_> = history.iter().map(|s| s.id).collect();
    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn committed_mutations_are_broadcast() {
    let (manager, _, delivery) = setup();
    let instructor = Uuid::new_v4();
    let learner = Uuid::new_v4();

    let session = manager.create(instructor, react_session()).await.unwrap();
    manager.join(learner, session.id).await.unwrap();
    manager
        .add_chat_message(learner, session.id, "hello".into())
        .await
        .unwrap();
    // A rejected transition must not publish anything.
    let _ = manager.join(Uuid::new_v4(), session.id).await;

    let events = delivery.events.read().await;
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        SessionEvent::StatusChanged {
            status: SessionStatus::Pending,
            ..
        }
    ));
    assert!(matches!(
        events[1],
        SessionEvent::StatusChanged {
            status: SessionStatus::Active,
            ..
        }
    ));
    assert!(matches!(events[2], SessionEvent::ChatMessage { .. }));
}
