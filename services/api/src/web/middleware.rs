//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.
//!
//! The session layer itself lives outside this service; an upstream proxy
//! resolves the login cookie and forwards the caller's identity in the
//! `x-user-id` header. This middleware validates that identity against the
//! user directory and hands it to the handlers.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::error;

use crate::web::state::AppState;

/// The authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

/// Middleware that resolves the `x-user-id` header to a known user.
///
/// If valid, inserts [`AuthUser`] into request extensions for handlers to use.
/// If missing, malformed, or unknown, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract the forwarded user id
    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Reject identities the directory does not know
    let exists = state.users.user_exists(user_id).await.map_err(|e| {
        error!("Failed to look up user {}: {:?}", user_id, e);
        StatusCode::UNAUTHORIZED
    })?;
    if !exists {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 3. Insert the user into request extensions
    req.extensions_mut().insert(AuthUser(user_id));

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
