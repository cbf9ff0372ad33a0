//! API handlers for the c2 server.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use c2_events::{list_events, store_event, validate_submission, Event, IngestError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Subject of tokens minted by `POST /token`.
pub const DEV_TOKEN_SUBJECT: &str = "operator";

/// Response body for `POST /token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Response body for a successful `POST /events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEventResponse {
    /// The generated event identifier.
    pub id: String,
}

/// Reads the page size from the `GET /events` query string.
///
/// Only the first `limit` counts. A missing or unparseable value yields `0`,
/// which the store turns into the default page.
fn requested_limit(params: &[(String, String)]) -> i64 {
    params
        .iter()
        .find(|(key, _)| key == "limit")
        .and_then(|(_, value)| value.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// API error type mapping to HTTP status codes.
///
/// Only `BadRequest` echoes its message to the client. Server-side failures
/// are logged with their cause and answered with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error: {0}")]
    InternalServerError(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::InternalServerError(cause) => {
                tracing::error!(%cause, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            ApiError::Storage(cause) => {
                tracing::error!(%cause, "storage operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::BadRequest(msg) => ApiError::BadRequest(msg),
            IngestError::Internal(msg) => ApiError::InternalServerError(msg),
            IngestError::Storage(source) => ApiError::Storage(source.to_string()),
        }
    }
}

/// Handler for `POST /token`.
///
/// Issues a token for [`DEV_TOKEN_SUBJECT`] without checking any credential.
/// Only mounted when `auth.issue_dev_tokens` is enabled.
pub async fn issue_token_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .tokens
        .issue(DEV_TOKEN_SUBJECT)
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    tracing::info!(subject = DEV_TOKEN_SUBJECT, "issued development token");

    Ok(Json(TokenResponse { token }))
}

/// Handler for `POST /events`.
///
/// The body is read as raw bytes so that every decode failure maps to 400.
/// Validation and id generation finish before a connection is taken.
pub async fn create_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateEventResponse>), ApiError> {
    let event = validate_submission(&body, Utc::now())?;

    let id = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::Storage(format!("db connection failed: {}", e)))?;
        store_event(&conn, &event).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok((StatusCode::CREATED, Json(CreateEventResponse { id })))
}

/// Handler for `GET /events`.
///
/// Returns the most recent events by observation time. A missing,
/// unparseable, non-positive or oversized `limit` yields the default page,
/// and a repeated `limit` uses its first value.
pub async fn list_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let limit = requested_limit(&params);

    let events = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::Storage(format!("db connection failed: {}", e)))?;
        list_events(&conn, limit).map_err(|e| ApiError::Storage(e.to_string()))
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn requested_limit_takes_first_value() {
        assert_eq!(requested_limit(&pairs(&[("limit", "5"), ("limit", "6")])), 5);
        assert_eq!(requested_limit(&pairs(&[("other", "1"), ("limit", " 7 ")])), 7);
    }

    #[test]
    fn requested_limit_defaults_to_zero() {
        assert_eq!(requested_limit(&[]), 0);
        assert_eq!(requested_limit(&pairs(&[("limit", "ten")])), 0);
        assert_eq!(requested_limit(&pairs(&[("limit", "")])), 0);
    }
}
