//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::types::IdentityClaims;
use crate::auth::{IdTokenVerifier, VerifyError};
use crate::config::AuthConfig;
use crate::repository::memory::MemoryRepository;
use crate::AppState;

/// Verifier that accepts a fixed set of tokens.
#[derive(Default)]
pub struct FakeVerifier {
    tokens: HashMap<String, IdentityClaims>,
}

impl FakeVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, claims: IdentityClaims) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }
}

#[async_trait]
impl IdTokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::Malformed("unknown test token".to_string()))
    }
}

pub fn identity(subject: &str, email: &str, name: Option<&str>) -> IdentityClaims {
    IdentityClaims {
        subject: subject.to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        picture: None,
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        google_client_id: "test-client.apps.googleusercontent.com".to_string(),
        google_certs_url: "http://127.0.0.1:9/certs".to_string(),
        jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
        token_ttl_seconds: 3600,
    }
}

pub fn test_state(repo: Arc<MemoryRepository>, verifier: FakeVerifier) -> AppState {
    AppState {
        auth_config: Arc::new(test_auth_config()),
        roles: repo.clone(),
        users: repo,
        verifier: Arc::new(verifier),
    }
}
