use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth;
use crate::handlers;
use crate::AppState;

pub fn api_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/google-login", post(auth::google_login))
        .route("/auth/health", get(auth::health));

    let protected = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/me", get(handlers::get_current_user))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth));

    public.merge(protected)
}

pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(allowed_origins))
        .with_state(state)
}

/// Build CORS layer from the configured origin allowlist.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    // tower-http panics on a wildcard inside an origin list
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter(|s| s.as_str() != "*")
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.len() != allowed_origins.len() {
        tracing::warn!("Some CORS origins could not be parsed and were ignored");
    }
    tracing::info!("CORS configured for origins: {:?}", origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
