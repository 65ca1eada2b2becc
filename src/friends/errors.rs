use thiserror::Error;

/// Errors that can arise while reading or mutating the friend graph.
///
/// "Not found" style conditions (unknown participant, missing relationship,
/// full list) are never errors; they are reported through
/// [`AddOutcome`](crate::friends::AddOutcome) and
/// [`RemoveOutcome`](crate::friends::RemoveOutcome).
#[derive(Debug, Error)]
pub enum FriendsError {
    /// A caller handed in a value that violates the API contract (e.g. an empty identifier).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON snapshot encoding errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, file locking, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot store refused a write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The derived reverse index no longer matches the forward map.
    #[error("reverse index mismatch: {0}")]
    IndexMismatch(String),
}
