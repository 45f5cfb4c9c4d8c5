//! Session JWT creation and validation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::types::{Claims, SessionUser};
use crate::config::AuthConfig;
use crate::models::User;

/// Create a session token for a user. Returns the token and its lifetime in
/// seconds.
pub fn create_token(
    config: &AuthConfig,
    user: &User,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    create_token_at(config, user, Utc::now())
}

pub fn create_token_at(
    config: &AuthConfig,
    user: &User,
    now: DateTime<Utc>,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let exp = now + Duration::seconds(config.token_ttl_seconds);

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.name,
        email: user.email.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, config.token_ttl_seconds))
}

/// Validate a session token and return the caller it identifies.
pub fn validate_token(
    config: &AuthConfig,
    token: &str,
) -> Result<SessionUser, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?;

    let claims = token_data.claims;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| jsonwebtoken::errors::ErrorKind::InvalidSubject)?;

    Ok(SessionUser {
        id,
        email: claims.email,
        role: claims.role,
    })
}
