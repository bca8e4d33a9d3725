//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protected routes.
//!
//! Authentication itself happens upstream (the gateway terminates the
//! credential exchange); by the time a request reaches this service the
//! caller is identified by the `x-user-id` header. The core never performs
//! credential checks.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The header carrying the caller identity resolved by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that extracts the caller's user id from the `x-user-id`
/// header.
///
/// If present and well-formed, inserts the `Uuid` into request extensions
/// for handlers to use. Otherwise returns 401 Unauthorized.
pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
