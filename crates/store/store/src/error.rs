use std::time::Duration;

use thiserror::Error;

/// Errors from key-value store operations.
///
/// Normal negative outcomes (a key already present, a missing field) are
/// never reported through this type; they are ordinary return values.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or the connection was dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store accepted the connection but rejected or failed the command.
    #[error("backend error: {0}")]
    Backend(String),

    /// A key was written with a TTL too short to be represented.
    #[error("invalid ttl {0:?}: must be at least 1ms")]
    InvalidTtl(Duration),
}

impl StoreError {
    /// Returns `true` if this error means the store could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
