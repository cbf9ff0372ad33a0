//! Event record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// A normalised event ready to be persisted.
///
/// Only the ingestion layer builds these; `created_at` is left to storage.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Freshly generated identifier.
    pub id: String,
    /// When the observation happened.
    pub ts: DateTime<Utc>,
    /// Non-empty classification string.
    pub event_type: String,
    /// Caller-supplied score, unvalidated.
    pub confidence: f64,
    /// Provenance identifiers, in submission order.
    pub sources: Vec<String>,
    /// Opaque JSON object exactly as submitted; `None` is stored as `null`.
    pub payload: Option<Box<RawValue>>,
}

/// A single row from the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    /// Returned byte-for-byte as stored.
    pub payload: Option<Box<RawValue>>,
    /// Set by storage when the row was inserted.
    pub created_at: DateTime<Utc>,
}
