//! Persistence operations for observation events.
//!
//! Writes go through [`create_event`], a single `INSERT … RETURNING`
//! statement, so a row is either fully visible or absent. Reads go through
//! [`list_events`], which returns the most recent events by observation time.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::value::RawValue;

use crate::error::StoreError;
use crate::event::{Event, NewEvent};

/// Page size used when the caller asks for none, or for too many.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Largest page a caller may request.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Normalises a requested page size.
///
/// Non-positive requests and requests above [`MAX_LIST_LIMIT`] fall back to
/// [`DEFAULT_LIST_LIMIT`] rather than being capped.
pub fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 || limit > MAX_LIST_LIMIT {
        DEFAULT_LIST_LIMIT
    } else {
        limit
    }
}

/// Inserts one event and returns the stored record.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure (including a duplicate id
/// or an empty `event_type`) and `StoreError::Serialization` if sources
/// cannot be encoded. The payload is written as submitted, never re-encoded.
pub fn create_event(conn: &Connection, event: &NewEvent) -> Result<Event, StoreError> {
    let sources_json = serde_json::to_string(&event.sources)?;
    let payload_json = event.payload.as_deref().map_or("null", RawValue::get);

    let created_at = conn.query_row(
        "INSERT INTO events (id, ts_micros, event_type, confidence, sources_json, payload_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING created_at",
        params![
            event.id,
            event.ts.timestamp_micros(),
            event.event_type,
            event.confidence,
            sources_json,
            payload_json,
        ],
        |row| parse_created_at(row, 0),
    )?;

    Ok(Event {
        id: event.id.clone(),
        ts: event.ts,
        event_type: event.event_type.clone(),
        confidence: event.confidence,
        sources: event.sources.clone(),
        payload: event.payload.clone(),
        created_at,
    })
}

/// Returns up to `limit` events, newest observation first.
///
/// `limit` is passed through [`clamp_limit`]. Events sharing a timestamp are
/// returned most recently inserted first.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure or if a stored row cannot be
/// decoded.
pub fn list_events(conn: &Connection, limit: i64) -> Result<Vec<Event>, StoreError> {
    let limit = clamp_limit(limit);

    let mut stmt = conn.prepare(
        "SELECT id, ts_micros, event_type, confidence, sources_json, payload_json, created_at
         FROM events
         ORDER BY ts_micros DESC, rowid DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], event_from_row)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }

    Ok(events)
}

/// Returns the number of stored events.
pub fn count_events(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let ts_micros: i64 = row.get(1)?;
    let ts = DateTime::from_timestamp_micros(ts_micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, ts_micros))?;

    let sources_json: String = row.get(4)?;
    let sources = serde_json::from_str(&sources_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let payload_json: String = row.get(5)?;
    let payload = serde_json::from_str::<Option<Box<RawValue>>>(&payload_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Event {
        id: row.get(0)?,
        ts,
        event_type: row.get(2)?,
        confidence: row.get(3)?,
        sources,
        payload,
        created_at: parse_created_at(row, 6)?,
    })
}

fn parse_created_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
