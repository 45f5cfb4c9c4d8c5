//! Google ID token verification.
//!
//! Tokens are RS256 JWTs signed with one of the keys Google publishes as a
//! JWKS. The key set is cached in-process for as long as the endpoint's
//! `Cache-Control: max-age` allows, then fetched again on the next call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use super::types::IdentityClaims;

/// Issuer values Google uses for ID tokens.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("No published key matches key id {0}")]
    UnknownKey(String),

    #[error("{0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),

    #[error("Token carries no email claim")]
    MissingEmail,

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Verifies external identity tokens.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct GooglePayload {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Check a token's signature, issuer, audience and expiry against `jwks`.
pub fn verify_with_keys(
    token: &str,
    jwks: &JwkSet,
    audience: &str,
) -> Result<IdentityClaims, VerifyError> {
    let header = decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;
    let kid = header
        .kid
        .ok_or_else(|| VerifyError::Malformed("header missing key id (kid)".to_string()))?;

    let jwk = jwks
        .find(&kid)
        .ok_or_else(|| VerifyError::UnknownKey(kid.clone()))?;
    let decoding_key = DecodingKey::from_jwk(jwk)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&GOOGLE_ISSUERS);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let payload = decode::<GooglePayload>(token, &decoding_key, &validation)?.claims;
    let email = payload
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(VerifyError::MissingEmail)?;

    Ok(IdentityClaims {
        subject: payload.sub,
        email,
        name: payload.name,
        picture: payload.picture,
    })
}

/// Read `max-age` from a `Cache-Control` header.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age="))
        .and_then(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

struct CachedKeys {
    jwks: Arc<JwkSet>,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Verifier backed by Google's published certificates.
pub struct GoogleIdTokenVerifier {
    client: reqwest::Client,
    certs_url: String,
    audience: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl GoogleIdTokenVerifier {
    pub fn new(certs_url: impl Into<String>, audience: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            certs_url: certs_url.into(),
            audience: audience.into(),
            keys: RwLock::new(None),
        })
    }

    async fn current_keys(&self) -> Result<Arc<JwkSet>, VerifyError> {
        if let Some(cached) = self.keys.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.jwks.clone());
            }
        }

        let mut guard = self.keys.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.jwks.clone());
            }
        }

        tracing::debug!("Fetching Google signing keys from {}", self.certs_url);
        let response = self
            .client
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerifyError::KeyFetch(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(DEFAULT_KEY_TTL);
        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;
        if jwks.keys.is_empty() {
            return Err(VerifyError::KeyFetch("key set is empty".to_string()));
        }

        tracing::info!(
            "Loaded {} Google signing keys (cached for {}s)",
            jwks.keys.len(),
            ttl.as_secs()
        );
        let jwks = Arc::new(jwks);
        *guard = Some(CachedKeys {
            jwks: jwks.clone(),
            expires_at: Instant::now() + ttl,
        });

        Ok(jwks)
    }

    #[cfg(test)]
    pub fn with_keys(audience: &str, jwks: JwkSet) -> Self {
        Self {
            client: reqwest::Client::new(),
            certs_url: "http://127.0.0.1:9/unused".to_string(),
            audience: audience.to_string(),
            keys: RwLock::new(Some(CachedKeys {
                jwks: Arc::new(jwks),
                expires_at: Instant::now() + DEFAULT_KEY_TTL,
            })),
        }
    }
}

#[async_trait]
impl IdTokenVerifier for GoogleIdTokenVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        let jwks = self.current_keys().await?;
        verify_with_keys(token, &jwks, &self.audience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const AUDIENCE: &str = "client-id.apps.googleusercontent.com";
    const PRIVATE_KEY: &[u8] = include_bytes!("../../testdata/google_test_key.pem");
    const JWKS: &str = include_str!("../../testdata/google_test_jwks.json");

    fn jwks() -> JwkSet {
        serde_json::from_str(JWKS).unwrap()
    }

    fn payload() -> Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": "https://accounts.google.com",
            "aud": AUDIENCE,
            "sub": "110169484474386276334",
            "email": "new-user@example.com",
            "email_verified": true,
            "iat": now,
            "exp": now + 3600,
        })
    }

    fn sign(claims: &Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(
            &header,
            claims,
            &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let token = sign(&payload(), "test-key-1");
        let claims = verify_with_keys(&token, &jwks(), AUDIENCE).unwrap();

        assert_eq!(claims.subject, "110169484474386276334");
        assert_eq!(claims.email, "new-user@example.com");
        assert_eq!(claims.name, None);
    }

    #[test]
    fn accepts_bare_issuer() {
        let mut claims = payload();
        claims["iss"] = json!("accounts.google.com");
        claims["name"] = json!("New User");
        claims["picture"] = json!("https://example.com/p.png");
        let token = sign(&claims, "test-key-1");

        let claims = verify_with_keys(&token, &jwks(), AUDIENCE).unwrap();
        assert_eq!(claims.name.as_deref(), Some("New User"));
        assert_eq!(claims.picture.as_deref(), Some("https://example.com/p.png"));
    }

    #[test]
    fn rejects_wrong_audience() {
        let token = sign(&payload(), "test-key-1");
        let err = verify_with_keys(&token, &jwks(), "someone-else").unwrap_err();
        assert!(matches!(err, VerifyError::Rejected(_)));
    }

    #[test]
    fn rejects_foreign_issuer() {
        let mut claims = payload();
        claims["iss"] = json!("https://evil.example.com");
        let token = sign(&claims, "test-key-1");
        assert!(verify_with_keys(&token, &jwks(), AUDIENCE).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let mut claims = payload();
        let past = Utc::now().timestamp() - 7200;
        claims["iat"] = json!(past);
        claims["exp"] = json!(past + 3600);
        let token = sign(&claims, "test-key-1");

        let err = verify_with_keys(&token, &jwks(), AUDIENCE).unwrap_err();
        match err {
            VerifyError::Rejected(e) => assert!(matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            )),
            other => panic!("expected expiry rejection, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_key_id() {
        let token = sign(&payload(), "rotated-away");
        let err = verify_with_keys(&token, &jwks(), AUDIENCE).unwrap_err();
        assert!(matches!(err, VerifyError::UnknownKey(kid) if kid == "rotated-away"));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = sign(&payload(), "test-key-1");
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut forged = payload();
        forged["email"] = json!("attacker@example.com");
        let forged_token = sign(&forged, "test-key-1");
        parts[1] = forged_token.split('.').nth(1).unwrap().to_string();

        assert!(verify_with_keys(&parts.join("."), &jwks(), AUDIENCE).is_err());
    }

    #[test]
    fn rejects_token_without_email() {
        let mut claims = payload();
        claims.as_object_mut().unwrap().remove("email");
        let token = sign(&claims, "test-key-1");

        let err = verify_with_keys(&token, &jwks(), AUDIENCE).unwrap_err();
        assert!(matches!(err, VerifyError::MissingEmail));
    }

    #[test]
    fn rejects_garbage() {
        let err = verify_with_keys("not-a-jwt", &jwks(), AUDIENCE).unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[test]
    fn parses_cache_control_max_age() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            "public, max-age=19958, must-revalidate, no-transform"
                .parse()
                .unwrap(),
        );
        assert_eq!(max_age(&headers), Some(Duration::from_secs(19958)));

        headers.insert(CACHE_CONTROL, "no-cache".parse().unwrap());
        assert_eq!(max_age(&headers), None);
    }

    #[tokio::test]
    async fn verifier_uses_cached_keys() {
        let verifier = GoogleIdTokenVerifier::with_keys(AUDIENCE, jwks());
        let token = sign(&payload(), "test-key-1");

        let claims = tokio_test::assert_ok!(verifier.verify(&token).await);
        assert_eq!(claims.email, "new-user@example.com");
    }

    /// Serve the test JWKS on a local port with `max-age=0`. Returns the
    /// certs URL; `hits` counts key fetches.
    async fn serve_keys(status: StatusCode, hits: Arc<AtomicUsize>) -> String {
        let app = axum::Router::new().route(
            "/certs",
            axum::routing::get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (status, [(CACHE_CONTROL, "public, max-age=0")], JWKS)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/certs", addr)
    }

    #[tokio::test]
    async fn expired_cache_is_refetched() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve_keys(StatusCode::OK, hits.clone()).await;
        let verifier = GoogleIdTokenVerifier::new(url, AUDIENCE).unwrap();
        let token = sign(&payload(), "test-key-1");

        tokio_test::assert_ok!(verifier.verify(&token).await);
        tokio_test::assert_ok!(verifier.verify(&token).await);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn key_endpoint_failure_fails_verification() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve_keys(StatusCode::INTERNAL_SERVER_ERROR, hits.clone()).await;
        let verifier = GoogleIdTokenVerifier::new(url, AUDIENCE).unwrap();
        let token = sign(&payload(), "test-key-1");

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::KeyFetch(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
