use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use c2_auth::Claims;
use std::sync::Arc;

use crate::api::ApiError;
use crate::AppState;

/// Verified token claims, stored in request extensions by
/// [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthContext(pub Claims);

/// Access gate for the protected event routes.
///
/// Requires an `Authorization: Bearer <token>` header that the state's
/// [`TokenManager`](c2_auth::TokenManager) accepts. Any valid token grants
/// full access; there is no per-subject scoping. On failure the wrapped
/// handler is never invoked and the caller gets a generic 401; the specific
/// reason only goes to the debug log.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("app state missing".to_string()))?
        .clone();

    let claims = {
        let header = match req.headers().get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                tracing::debug!("rejected request: non-ascii Authorization header");
                ApiError::Unauthorized
            })?),
            None => None,
        };

        state.tokens.verify(header).map_err(|e| {
            tracing::debug!(
                path = %req.uri().path(),
                reason = %e,
                "rejected request: credential not accepted"
            );
            ApiError::Unauthorized
        })?
    };

    req.extensions_mut().insert(AuthContext(claims));

    Ok(next.run(req).await)
}
