use axum::{
    extract::{Extension, State},
    Json,
};
use shared_types::{RoleName, UserInfo};

use crate::auth::{require_role, types::SessionUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

// User handlers

/// The caller's own profile, re-read from the store.
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> ApiResult<Json<UserInfo>> {
    let user = state
        .users
        .find_by_id(session.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))?;

    Ok(Json(user.info()))
}

/// All users. PARENT only.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    require_role(&session, RoleName::Parent)?;

    let users = state.users.list_all().await?;
    let responses: Vec<UserInfo> = users.iter().map(|u| u.info()).collect();

    Ok(Json(responses))
}
