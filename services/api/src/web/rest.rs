//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use skill_exchange_core::domain::ProfileUpdate;
use skill_exchange_core::lifecycle::{CreateSession, EndSession, NoteInput};
use skill_exchange_core::ports::PortError;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
    ),
    components(
        schemas(CreateSessionResponse)
    ),
    tags(
        (name = "Skill Exchange API", description = "API endpoints for peer-to-peer skill matching and learning sessions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload sent after successfully creating a session.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub message: String,
}

/// Body of a chat-message append.
#[derive(Deserialize)]
pub struct ChatBody {
    pub message: String,
}

//=========================================================================================
// Profile and Match Handlers
//=========================================================================================

/// Creates or updates the caller's profile. Input is validated at the
/// boundary before it reaches the store.
pub async fn upsert_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let update = update
        .validated()
        .map_err(|msg| ApiError::Port(PortError::Validation(msg)))?;
    let profile = state.profiles.upsert_profile(user_id, update).await?;
    Ok(Json(profile))
}

/// Returns the caller's own profile, 404 when none exists yet.
pub async fn my_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.profiles.get_profile(user_id).await?;
    Ok(Json(profile))
}

/// Returns the ranked match list for the caller.
pub async fn matches_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let matches = state.matcher.find_matches(user_id).await?;
    Ok(Json(matches))
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Creates a new learning session with the caller as instructor.
#[utoipa::path(
    post,
    path = "/api/session/create",
    request_body(content_type = "application/json", description = "Skill, session type and scheduled duration."),
    responses(
        (status = 201, description = "Session created successfully", body = CreateSessionResponse),
        (status = 422, description = "Malformed input (e.g. missing skill name)"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the caller.")
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(input): Json<CreateSession>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.create(user_id, input).await?;
    let response = CreateSessionResponse {
        success: true,
        session_id: session.id,
        message: "Session created successfully".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sessions the caller is part of that are still pending or active.
pub async fn active_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.active_for_user(user_id).await?;
    Ok(Json(sessions))
}

/// The caller's completed sessions, newest first.
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.history_for_user(user_id).await?;
    Ok(Json(sessions))
}

/// Joins a pending session as learner.
pub async fn join_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.join(user_id, session_id).await?;
    Ok(Json(session))
}

/// Ends a session with optional closing notes and feedback.
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<EndSession>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.end(user_id, session_id, input).await?;
    Ok(Json(session))
}

/// Cancels a still-pending session.
pub async fn cancel_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.cancel(user_id, session_id).await?;
    Ok(Json(session))
}

/// Appends a chat message to a session.
pub async fn add_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<ChatBody>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .sessions
        .add_chat_message(user_id, session_id, body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Appends a note to a session.
pub async fn add_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<NoteInput>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.sessions.add_note(user_id, session_id, input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}
