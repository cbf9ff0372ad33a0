//! c2 ingestion server library logic.

pub mod api;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use c2_auth::{TokenManager, TokenSettings};
use c2_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Token signer and verifier.
    pub tokens: Arc<TokenManager>,
    /// Whether the event routes are gated behind a bearer token.
    pub require_auth: bool,
    /// Whether `POST /token` is mounted.
    pub issue_dev_tokens: bool,
}

impl AppState {
    /// Builds the state from loaded configuration and an open pool.
    pub fn from_config(pool: DbPool, auth: &config::AuthConfig) -> Self {
        let settings = TokenSettings::new(auth.jwt_secret.clone(), auth.jwt_issuer.clone())
            .with_ttl(auth.token_ttl());
        Self {
            pool,
            tokens: Arc::new(TokenManager::new(settings)),
            require_auth: auth.require_auth,
            issue_dev_tokens: auth.issue_dev_tokens,
        }
    }
}

/// Maximum request body size (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler. Never gated.
async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Builds the application router with all routes.
///
/// The access gate is attached to the event routes only when
/// `state.require_auth` is set; the decision is made here, once. It is a
/// route layer, so unmatched paths still fall through to a plain 404.
pub fn app(state: AppState) -> Router {
    let mut event_routes = Router::new().route(
        "/events",
        post(api::create_event_handler).get(api::list_events_handler),
    );
    if state.require_auth {
        event_routes =
            event_routes.route_layer(axum::middleware::from_fn(middleware::auth_middleware));
    }

    let mut router = Router::new()
        .route("/healthz", get(health))
        .merge(event_routes);
    if state.issue_dev_tokens {
        router = router.route("/token", post(api::issue_token_handler));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
