//! Google sign-in flow.
//!
//! Verifies the identity token, finds or creates the local user and issues
//! the session token. Extracted from the HTTP handler so the flow can be
//! exercised with a fake verifier and the in-memory repository.

use chrono::Utc;
use shared_types::{LoginResponse, RoleName};

use crate::auth::types::IdentityClaims;
use crate::auth::{jwt, IdTokenVerifier, VerifyError};
use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult, StoreError};
use crate::models::{LoginUpdate, NewUser, User};
use crate::repository::{RoleRepository, UserRepository};
use crate::AppState;

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::KeyFetch(msg) => {
                ApiError::Internal(anyhow::anyhow!("Google key fetch failed: {}", msg))
            }
            other => ApiError::InvalidToken(other.to_string()),
        }
    }
}

/// Display name from the `name` claim, or the local part of the email when
/// the claim is absent or blank. An empty local part falls back to the whole
/// address.
pub fn display_name(claims: &IdentityClaims) -> String {
    match claims.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => match claims.email.split('@').next() {
            Some(local) if !local.trim().is_empty() => local.to_string(),
            _ => claims.email.clone(),
        },
    }
}

pub struct AuthenticationService<'a> {
    verifier: &'a dyn IdTokenVerifier,
    roles: &'a dyn RoleRepository,
    users: &'a dyn UserRepository,
    config: &'a AuthConfig,
}

impl<'a> AuthenticationService<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            verifier: state.verifier.as_ref(),
            roles: state.roles.as_ref(),
            users: state.users.as_ref(),
            config: &state.auth_config,
        }
    }

    /// Authenticate a raw Google ID token.
    pub async fn authenticate(&self, raw_token: &str) -> ApiResult<LoginResponse> {
        let claims = self.verifier.verify(raw_token).await?;

        let update = LoginUpdate {
            display_name: display_name(&claims),
            picture_url: claims.picture.clone(),
            last_login: Utc::now(),
        };

        tracing::info!(
            "Google login verified for {} ({})",
            claims.email,
            update.display_name
        );

        let user = match self.users.find_by_google_id(&claims.subject).await? {
            Some(existing) => {
                let user = self.users.record_login(existing.id, update).await?;
                tracing::info!("Existing user updated: {}", user.email);
                user
            }
            None => self.create_user(&claims, update).await?,
        };

        let (token, expires_in) = jwt::create_token(self.config, &user)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to create token: {}", e)))?;

        Ok(LoginResponse {
            token,
            expires_in,
            user: user.info(),
        })
    }

    async fn create_user(&self, claims: &IdentityClaims, update: LoginUpdate) -> ApiResult<User> {
        let role = self
            .roles
            .find_by_name(RoleName::Parent)
            .await?
            .ok_or_else(|| {
                ApiError::Config("PARENT role not found; did role seeding run?".to_string())
            })?;

        let new_user = NewUser {
            google_id: claims.subject.clone(),
            email: claims.email.clone(),
            display_name: update.display_name.clone(),
            picture_url: update.picture_url.clone(),
            role_id: role.id,
            last_login: update.last_login,
        };

        match self.users.create(new_user).await {
            Ok(user) => {
                tracing::info!("New user created: {} with role {}", user.email, user.role.name);
                Ok(user)
            }
            Err(StoreError::Duplicate(constraint)) => {
                // A concurrent first login inserted the row; fall back to the update path
                tracing::warn!(
                    "Concurrent first login for {} ({}); using existing user",
                    claims.email,
                    constraint
                );
                let existing = self
                    .users
                    .find_by_google_id(&claims.subject)
                    .await?
                    .ok_or_else(|| {
                        ApiError::Internal(anyhow::anyhow!(
                            "user vanished after duplicate insert"
                        ))
                    })?;
                Ok(self.users.record_login(existing.id, update).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
