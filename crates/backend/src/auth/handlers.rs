//! Authentication HTTP handlers.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use shared_types::{GoogleTokenRequest, LoginResponse};

use crate::error::{ApiError, ApiResult};
use crate::services::AuthenticationService;
use crate::AppState;

const HEALTH_MESSAGE: &str = "FamilyTask API is running!";

/// Exchange a Google ID token for a session token.
///
/// Verifies the token, creates the user on first login (as PARENT) or
/// refreshes the stored profile, and returns a signed session token.
pub async fn google_login(
    State(state): State<AppState>,
    payload: Result<Json<GoogleTokenRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;

    let token = payload
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Google token is required"))?;

    let response = AuthenticationService::from_state(&state)
        .authenticate(token)
        .await?;

    Ok(Json(response))
}

/// Liveness check.
pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}
