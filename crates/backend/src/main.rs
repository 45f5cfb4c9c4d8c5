use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod repository;
mod routes;
mod schema;
mod services;
#[cfg(test)]
mod test_support;

use crate::auth::{GoogleIdTokenVerifier, IdTokenVerifier};
use crate::config::{AppConfig, AuthConfig};
use crate::repository::{PgRepository, RoleRepository, UserRepository};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub auth_config: Arc<AuthConfig>,
    pub roles: Arc<dyn RoleRepository>,
    pub users: Arc<dyn UserRepository>,
    pub verifier: Arc<dyn IdTokenVerifier>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!("Starting FamilyTask backend");
    tracing::debug!(
        "Database TLS: {}, auth: {:?}",
        config.database_tls,
        config.auth
    );

    // Establish database connection pool
    let pool = db::establish_connection_pool(&config.database_url, config.database_tls)?;
    let repository = Arc::new(PgRepository::new(pool));

    // Roles must exist before the first login can create a user
    let created = services::seed_roles(&*repository).await?;
    tracing::info!("Role seeding complete ({} created)", created);

    let verifier = GoogleIdTokenVerifier::new(
        config.auth.google_certs_url.clone(),
        config.auth.google_client_id.clone(),
    )?;

    let state = AppState {
        auth_config: Arc::new(config.auth.clone()),
        roles: repository.clone(),
        users: repository,
        verifier: Arc::new(verifier),
    };

    let app = routes::create_app(state, &config.cors_allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
