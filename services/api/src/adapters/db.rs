//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `ProfileStore` and `SessionStore` ports from the
//! core crate. It handles all interactions with the PostgreSQL database
//! using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use skill_exchange_core::domain::{
    Availability, ChatMessage, Note, Profile, ProfileUpdate, Session, SessionFeedback,
    SessionStatus, SessionType, Skill, SkillLevel,
};
use skill_exchange_core::ports::{PortError, PortResult, ProfileStore, SessionStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the profile and session store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// Text Encodings for the Enum Columns
//=========================================================================================

fn availability_to_str(a: Availability) -> &'static str {
    match a {
        Availability::Morning => "Morning",
        Availability::Afternoon => "Afternoon",
        Availability::Evenings => "Evenings",
        Availability::Weekends => "Weekends",
        Availability::Flexible => "Flexible",
    }
}

fn availability_from_str(s: &str) -> PortResult<Availability> {
    match s {
        "Morning" => Ok(Availability::Morning),
        "Afternoon" => Ok(Availability::Afternoon),
        "Evenings" => Ok(Availability::Evenings),
        "Weekends" => Ok(Availability::Weekends),
        "Flexible" => Ok(Availability::Flexible),
        other => Err(PortError::Unexpected(format!(
            "unknown availability '{}' in database",
            other
        ))),
    }
}

fn level_to_str(l: SkillLevel) -> &'static str {
    match l {
        SkillLevel::Beginner => "Beginner",
        SkillLevel::Intermediate => "Intermediate",
        SkillLevel::Advanced => "Advanced",
        SkillLevel::Expert => "Expert",
    }
}

fn level_from_str(s: &str) -> PortResult<SkillLevel> {
    match s {
        "Beginner" => Ok(SkillLevel::Beginner),
        "Intermediate" => Ok(SkillLevel::Intermediate),
        "Advanced" => Ok(SkillLevel::Advanced),
        "Expert" => Ok(SkillLevel::Expert),
        other => Err(PortError::Unexpected(format!(
            "unknown skill level '{}' in database",
            other
        ))),
    }
}

fn session_type_to_str(t: SessionType) -> &'static str {
    match t {
        SessionType::Video => "video",
        SessionType::Audio => "audio",
        SessionType::Chat => "chat",
    }
}

fn session_type_from_str(s: &str) -> PortResult<SessionType> {
    match s {
        "video" => Ok(SessionType::Video),
        "audio" => Ok(SessionType::Audio),
        "chat" => Ok(SessionType::Chat),
        other => Err(PortError::Unexpected(format!(
            "unknown session type '{}' in database",
            other
        ))),
    }
}

fn status_to_str(s: SessionStatus) -> &'static str {
    match s {
        SessionStatus::Pending => "pending",
        SessionStatus::Active => "active",
        SessionStatus::Completed => "completed",
        SessionStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> PortResult<SessionStatus> {
    match s {
        "pending" => Ok(SessionStatus::Pending),
        "active" => Ok(SessionStatus::Active),
        "completed" => Ok(SessionStatus::Completed),
        "cancelled" => Ok(SessionStatus::Cancelled),
        other => Err(PortError::Unexpected(format!(
            "unknown session status '{}' in database",
            other
        ))),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    skills_offer: Vec<String>,
    skills_learn: Vec<String>,
    availability: String,
    level: String,
    bio: String,
    rating: Option<f64>,
    tokens: Option<i64>,
}

impl ProfileRecord {
    fn to_domain(self) -> PortResult<Profile> {
        Ok(Profile {
            user_id: self.user_id,
            skills_offer: self.skills_offer,
            skills_learn: self.skills_learn,
            availability: availability_from_str(&self.availability)?,
            level: level_from_str(&self.level)?,
            bio: self.bio,
            rating: self.rating,
            tokens: self.tokens,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    instructor: Uuid,
    learner: Option<Uuid>,
    skill: Json<Skill>,
    session_type: String,
    status: String,
    scheduled_minutes: i32,
    tokens_exchanged: i64,
    chat_messages: Json<Vec<ChatMessage>>,
    notes: Json<Vec<Note>>,
    feedback: Json<SessionFeedback>,
    created_at: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        Ok(Session {
            id: self.id,
            instructor: self.instructor,
            learner: self.learner,
            skill: self.skill.0,
            session_type: session_type_from_str(&self.session_type)?,
            status: status_from_str(&self.status)?,
            scheduled_minutes: self.scheduled_minutes as u32,
            tokens_exchanged: self.tokens_exchanged as u32,
            chat_messages: self.chat_messages.0,
            notes: self.notes.0,
            feedback: self.feedback.0,
            created_at: self.created_at,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

const PROFILE_COLUMNS: &str = "p.user_id, p.skills_offer, p.skills_learn, p.availability, \
     p.level, p.bio, u.rating, u.tokens";

const SESSION_COLUMNS: &str = "id, instructor, learner, skill, session_type, status, \
     scheduled_minutes, tokens_exchanged, chat_messages, notes, feedback, created_at, \
     start_time, end_time";

//=========================================================================================
// `ProfileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileStore for DbAdapter {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles p \
             LEFT JOIN users u ON u.user_id = p.user_id \
             WHERE p.user_id = $1"
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Profile for user {} not found", user_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_other_profiles(&self, exclude_user_id: Uuid) -> PortResult<Vec<Profile>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles p \
             LEFT JOIN users u ON u.user_id = p.user_id \
             WHERE p.user_id <> $1 \
             ORDER BY p.created_at ASC"
        );
        let records = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(exclude_user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn upsert_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        // The reputation row must exist before the profile can join against it.
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        // Missing fields keep their stored value on update and fall back to
        // the platform defaults on first insert.
        sqlx::query(
            "INSERT INTO profiles (user_id, skills_offer, skills_learn, availability, level, bio) \
             VALUES ($1, \
                     COALESCE($2, ARRAY[]::text[]), \
                     COALESCE($3, ARRAY[]::text[]), \
                     COALESCE($4, 'Evenings'), \
                     COALESCE($5, 'Intermediate'), \
                     COALESCE($6, '')) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 skills_offer = COALESCE($2, profiles.skills_offer), \
                 skills_learn = COALESCE($3, profiles.skills_learn), \
                 availability = COALESCE($4, profiles.availability), \
                 level = COALESCE($5, profiles.level), \
                 bio = COALESCE($6, profiles.bio), \
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(update.skills_offer)
        .bind(update.skills_learn)
        .bind(update.availability.map(availability_to_str))
        .bind(update.level.map(level_to_str))
        .bind(update.bio)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.get_profile(user_id).await
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn insert_session(&self, session: Session) -> PortResult<Session> {
        sqlx::query(
            "INSERT INTO sessions (id, instructor, learner, skill, session_type, status, \
             scheduled_minutes, tokens_exchanged, chat_messages, notes, feedback, created_at, \
             start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(session.id)
        .bind(session.instructor)
        .bind(session.learner)
        .bind(Json(&session.skill))
        .bind(session_type_to_str(session.session_type))
        .bind(status_to_str(session.status))
        .bind(session.scheduled_minutes as i32)
        .bind(session.tokens_exchanged as i64)
        .bind(Json(&session.chat_messages))
        .bind(Json(&session.notes))
        .bind(Json(&session.feedback))
        .bind(session.created_at)
        .bind(session.start_time)
        .bind(session.end_time)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> PortResult<Session> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Session {} not found", id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn save_session(&self, session: &Session) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET learner = $2, status = $3, scheduled_minutes = $4, \
             tokens_exchanged = $5, chat_messages = $6, notes = $7, feedback = $8, \
             start_time = $9, end_time = $10 \
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(session.learner)
        .bind(status_to_str(session.status))
        .bind(session.scheduled_minutes as i32)
        .bind(session.tokens_exchanged as i64)
        .bind(Json(&session.chat_messages))
        .bind(Json(&session.notes))
        .bind(Json(&session.feedback))
        .bind(session.start_time)
        .bind(session.end_time)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session.id
            )));
        }
        Ok(())
    }

    async fn list_sessions_for_user(
        &self,
        user_id: Uuid,
        statuses: &[SessionStatus],
    ) -> PortResult<Vec<Session>> {
        let status_strs: Vec<&str> = statuses.iter().map(|s| status_to_str(*s)).collect();
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE (instructor = $1 OR learner = $1) AND status = ANY($2) \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(user_id)
            .bind(status_strs)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
