//! Error types for event ingestion and storage.

/// Errors raised by the store gateway.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("event store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Sources could not be serialised for storage.
    #[error("event store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while accepting a submission.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The submission is malformed or incomplete. The message names the
    /// offending field and is safe to show to the client.
    #[error("{0}")]
    BadRequest(String),

    /// A server-side step before storage failed (identifier generation).
    #[error("internal error: {0}")]
    Internal(String),

    /// Persisting the normalised event failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
