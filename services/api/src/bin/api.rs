//! services/api/src/bin/api.rs

use std::sync::Arc;

use api_lib::{
    adapters::{db::DbAdapter, presence::InMemoryPresence, realtime::BroadcastDelivery},
    config::Config,
    error::ApiError,
    web::{
        active_sessions_handler, add_chat_handler, add_note_handler, cancel_session_handler,
        cors_layer, create_session_handler, end_session_handler, history_handler,
        join_session_handler, matches_handler, my_profile_handler, require_identity, rest::ApiDoc,
        state::AppState, upsert_profile_handler, ws_handler,
    },
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use skill_exchange_core::matching::MatchService;
use skill_exchange_core::SessionManager;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            config.log_level.to_string(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Build the Core Services ---
    let delivery = Arc::new(BroadcastDelivery::new(config.event_buffer));
    let session_manager = Arc::new(SessionManager::new(db_adapter.clone(), delivery.clone()));
    let match_service = MatchService::new(db_adapter.clone());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        profiles: db_adapter,
        sessions: session_manager,
        matcher: match_service,
        presence: Arc::new(InMemoryPresence::default()),
        events: delivery,
        config: config.clone(),
    });

    let cors = cors_layer(&config.cors_origin)
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;

    // --- 5. Create the Web Router ---
    // Every route requires a resolved identity; credential checks happen
    // upstream of this service.
    let api_router = Router::new()
        .route("/api/profile", post(upsert_profile_handler))
        .route("/api/profile/me", get(my_profile_handler))
        .route("/api/match", get(matches_handler))
        .route("/api/session/create", post(create_session_handler))
        .route("/api/session/active", get(active_sessions_handler))
        .route("/api/session/history", get(history_handler))
        .route("/api/session/{id}/join", put(join_session_handler))
        .route("/api/session/{id}/end", put(end_session_handler))
        .route("/api/session/{id}/cancel", put(cancel_session_handler))
        .route("/api/session/{id}/chat", post(add_chat_handler))
        .route("/api/session/{id}/notes", post(add_note_handler))
        .route("/api/session/{id}/ws", get(ws_handler))
        .layer(axum_middleware::from_fn(require_identity))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
