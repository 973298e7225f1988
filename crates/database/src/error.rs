//! Error types for the event store and source database.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Failed to encode or decode payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to compute catalog diff: {0}")]
    Diff(#[from] ddldiff::Error),

    #[error("Invalid event kind: {0}")]
    InvalidEventKind(String),

    #[error("Invalid event status: {0}")]
    InvalidEventStatus(String),

    #[error("Invalid batch status: {0}")]
    InvalidBatchStatus(String),

    /// A notification payload did not have the `id,kind,tag,event,txid,data` shape
    #[error("Malformed event record: {0}")]
    MalformedEvent(String),

    #[error("Event {event_id} has no data")]
    MissingData { event_id: i64 },
}
