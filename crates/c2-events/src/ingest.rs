//! Validation and normalisation of untrusted event submissions.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::error::IngestError;
use crate::event::NewEvent;
use crate::store::create_event;

/// A raw submission as sent by a client.
///
/// Only `event_type` is required. Unknown fields, including any attempt to
/// supply an `id`, are ignored. `payload` is kept as the raw JSON text the
/// client sent, so numbers of any size survive storage unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSubmission {
    /// Observation time in seconds since the Unix epoch. Absent or `0` means
    /// "now".
    pub ts: Option<f64>,
    pub event_type: Option<String>,
    pub confidence: Option<f64>,
    pub sources: Option<Vec<String>>,
    pub payload: Option<Box<RawValue>>,
}

impl EventSubmission {
    /// Decodes a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::BadRequest` if the body is not valid JSON or a
    /// field has the wrong shape (e.g. a non-object `payload`).
    pub fn from_json(body: &[u8]) -> Result<Self, IngestError> {
        let submission: Self = serde_json::from_slice(body)
            .map_err(|e| IngestError::BadRequest(format!("invalid json: {e}")))?;

        if let Some(payload) = &submission.payload {
            if !payload.get().trim_start().starts_with('{') {
                return Err(IngestError::BadRequest(
                    "invalid json: payload must be an object".to_string(),
                ));
            }
        }

        Ok(submission)
    }
}

/// Generates a fresh random (version 4) event identifier.
///
/// # Errors
///
/// Returns `IngestError::Internal` if the OS random source fails.
pub fn new_event_id() -> Result<Uuid, IngestError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| IngestError::Internal(format!("id generation failed: {e}")))?;
    Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
}

/// Validates a submission and turns it into a record ready for storage.
///
/// A `ts` of exactly zero cannot be told apart from an omitted one and is
/// replaced by `now`.
///
/// # Errors
///
/// - `IngestError::BadRequest` if `event_type` is absent or empty, or `ts`
///   cannot be represented as a UTC timestamp.
/// - `IngestError::Internal` if no identifier can be generated.
pub fn normalize(submission: EventSubmission, now: DateTime<Utc>) -> Result<NewEvent, IngestError> {
    let event_type = match submission.event_type {
        Some(t) if !t.is_empty() => t,
        _ => return Err(IngestError::BadRequest("event_type required".to_string())),
    };

    let ts = resolve_timestamp(submission.ts.unwrap_or(0.0), now)?;
    let id = new_event_id()?;

    Ok(NewEvent {
        id: id.to_string(),
        ts,
        event_type,
        confidence: submission.confidence.unwrap_or(0.0),
        sources: submission.sources.unwrap_or_default(),
        payload: submission.payload,
    })
}

fn resolve_timestamp(ts: f64, now: DateTime<Utc>) -> Result<DateTime<Utc>, IngestError> {
    if ts == 0.0 {
        return Ok(now);
    }

    let micros = (ts * 1_000_000.0).round();
    let out_of_range = || IngestError::BadRequest(format!("ts out of range: {ts:e}"));
    if !micros.is_finite() || micros < i64::MIN as f64 || micros >= i64::MAX as f64 {
        return Err(out_of_range());
    }

    DateTime::from_timestamp_micros(micros as i64).ok_or_else(out_of_range)
}

/// Decodes and normalises a request body without touching storage.
///
/// # Errors
///
/// `IngestError::BadRequest` for undecodable or incomplete bodies,
/// `IngestError::Internal` if no identifier can be generated.
pub fn validate_submission(body: &[u8], now: DateTime<Utc>) -> Result<NewEvent, IngestError> {
    let submission = EventSubmission::from_json(body)?;
    normalize(submission, now)
}

/// Accepts one submission: decode, validate, normalise, insert.
///
/// Returns the generated identifier once the row is durably stored. Nothing
/// touches storage unless decoding, validation and id generation all
/// succeeded.
///
/// # Errors
///
/// `IngestError::BadRequest` and `IngestError::Internal` as for
/// [`validate_submission`]; `IngestError::Storage` if the insert fails, in
/// which case no identifier is returned.
pub fn ingest_event(conn: &Connection, body: &[u8]) -> Result<String, IngestError> {
    let event = validate_submission(body, Utc::now())?;
    store_event(conn, &event)
}

/// Persists an already validated event and returns its identifier.
pub fn store_event(conn: &Connection, event: &NewEvent) -> Result<String, IngestError> {
    let stored = create_event(conn, event)?;

    tracing::debug!(
        id = %stored.id,
        event_type = %stored.event_type,
        ts = %stored.ts,
        "event ingested"
    );

    Ok(stored.id)
}
