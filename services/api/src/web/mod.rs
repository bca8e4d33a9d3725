pub mod middleware;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers needed by the binary that builds the router.
pub use middleware::require_identity;
pub use rest::{
    active_sessions_handler, add_chat_handler, add_note_handler, cancel_session_handler,
    create_session_handler, end_session_handler, history_handler, join_session_handler,
    matches_handler, my_profile_handler, upsert_profile_handler,
};
pub use ws_handler::ws_handler;

use axum::http::{
    header::{InvalidHeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use tower_http::cors::CorsLayer;

/// The CORS policy for the API.
///
/// Browser clients at the configured origin must be able to send the
/// identity header on every request, so it is part of the allow list
/// alongside the usual content headers.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::USER_ID_HEADER),
        ]))
}
