//! Observation event ingestion and storage.
//!
//! Two layers live here:
//!
//! - the **store gateway** ([`create_event`], [`list_events`]): a typed
//!   interface over the `events` table. Inserts are single-row and atomic;
//!   listings are ordered by observation time, most recent first, with the
//!   page size clamped to [`DEFAULT_LIST_LIMIT`] / [`MAX_LIST_LIMIT`].
//! - the **ingestion validator** ([`ingest_event`], [`normalize`]): decodes an
//!   untrusted submission, enforces the required `event_type`, assigns a fresh
//!   identifier and a default timestamp, and hands the record to the store.
//!
//! Payloads are opaque: they are stored as JSON text and returned verbatim,
//! never inspected.
//!
//! # Usage
//!
//! ```rust,ignore
//! use c2_events::{ingest_event, list_events};
//!
//! let id = ingest_event(&conn, br#"{"event_type":"flood","confidence":0.8}"#)?;
//! let latest = list_events(&conn, 10)?;
//! assert_eq!(latest[0].id, id);
//! ```

mod error;
mod event;
mod ingest;
mod store;

pub use error::{IngestError, StoreError};
pub use event::{Event, NewEvent};
pub use ingest::{
    ingest_event, new_event_id, normalize, store_event, validate_submission, EventSubmission,
};
pub use store::{
    clamp_limit, count_events, create_event, list_events, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
