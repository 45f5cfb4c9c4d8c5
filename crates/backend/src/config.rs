use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;

pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:4200,http://localhost:8080";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_tls: bool,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthConfig,
}

/// Trust parameters for Google ID tokens and session token signing.
#[derive(Clone)]
pub struct AuthConfig {
    pub google_client_id: String,
    pub google_certs_url: String,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("google_client_id", &self.google_client_id)
            .field("google_certs_url", &self.google_certs_url)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `DATABASE_URL`: Postgres connection string
    /// - `GOOGLE_CLIENT_ID`: expected audience of Google ID tokens
    /// - `JWT_SECRET`: secret for signing session tokens
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let database_tls = match lookup("DATABASE_TLS") {
            Some(v) => v
                .parse::<bool>()
                .context("DATABASE_TLS must be true or false")?,
            None => true,
        };

        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .context("PORT must be a valid number")?;

        let cors_allowed_origins: Vec<String> = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        // Credentialed CORS cannot use a wildcard origin
        if cors_allowed_origins.iter().any(|o| o == "*") {
            bail!("CORS_ALLOWED_ORIGINS must list explicit origins, not '*'");
        }

        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN);
        }

        let token_ttl_seconds: i64 = lookup("JWT_EXPIRATION_SECONDS")
            .unwrap_or_else(|| "86400".to_string())
            .parse()
            .context("JWT_EXPIRATION_SECONDS must be a valid number")?;
        if token_ttl_seconds <= 0 {
            bail!("JWT_EXPIRATION_SECONDS must be positive");
        }

        Ok(Self {
            database_url,
            database_tls,
            port,
            cors_allowed_origins,
            auth: AuthConfig {
                google_client_id: lookup("GOOGLE_CLIENT_ID")
                    .context("GOOGLE_CLIENT_ID must be set")?,
                google_certs_url: lookup("GOOGLE_CERTS_URL")
                    .unwrap_or_else(|| GOOGLE_CERTS_URL.to_string()),
                jwt_secret,
                token_ttl_seconds,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/familytask"),
        ("GOOGLE_CLIENT_ID", "client-id.apps.googleusercontent.com"),
        ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.database_tls);
        assert_eq!(config.auth.token_ttl_seconds, 86400);
        assert_eq!(config.auth.google_certs_url, GOOGLE_CERTS_URL);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:4200", "http://localhost:8080"]
        );
    }

    #[test]
    fn missing_client_id_is_reported() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "GOOGLE_CLIENT_ID")
            .collect();
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLIENT_ID"));
    }

    #[test]
    fn wildcard_cors_origin_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CORS_ALLOWED_ORIGINS", "http://localhost:4200, *"));

        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("CORS_ALLOWED_ORIGINS"));
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("JWT_SECRET", "short");
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let config = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("<redacted>"));
    }
}
