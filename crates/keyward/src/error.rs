use thiserror::Error;

use keyward_store::StoreError;

/// Errors from session operations.
///
/// A missing session, a wrong token or an expired token are not errors; they
/// are reported as a [`TokenStatus`](crate::TokenStatus).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store failed; propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored expiry for a principal is missing or not a finite number.
    #[error("corrupted session expiry for principal {principal}: {value:?}")]
    CorruptedExpiry {
        principal: String,
        /// The raw stored value, `None` if the field was missing.
        value: Option<String>,
    },
}
