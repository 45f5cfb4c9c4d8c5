//! Authentication middleware layer for protecting routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use shared_types::RoleName;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::jwt;
use super::types::SessionUser;

/// Middleware function that requires a valid session token.
///
/// Used with `axum::middleware::from_fn_with_state`. On success the
/// `SessionUser` is stored in the request extensions for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> ApiResult<Response> {
    let session = extract_session_user(request.headers(), &state)?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extract and validate the caller from request headers.
fn extract_session_user(headers: &HeaderMap, state: &AppState) -> ApiResult<SessionUser> {
    let token = extract_token_from_header(headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication"))?;

    jwt::validate_token(&state.auth_config, token).map_err(|e| {
        tracing::debug!("Session token rejected: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })
}

/// Guard composed in front of role-restricted handlers.
pub fn require_role(session: &SessionUser, required: RoleName) -> ApiResult<()> {
    if session.role == required {
        Ok(())
    } else {
        tracing::warn!(
            "User {} with role {} denied access requiring {}",
            session.id,
            session.role,
            required
        );
        Err(ApiError::forbidden(format!("Requires role {}", required)))
    }
}
