use thiserror::Error;

/// Infrastructure failures from a storage backend.
///
/// Domain outcomes (denied claims, lost renewals, stale publishes) are
/// modeled as result enums, not errors; this type covers the transport
/// and persistence layer only. `Unavailable` maps to the NETWORK_ERROR
/// reason at the API boundary and is always retryable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "sqlite")]
    #[error("payload encoding: {0}")]
    Codec(#[from] serde_json::Error),
}
