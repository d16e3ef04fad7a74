//! Error types for the storage layer.

/// Errors returned by a [`Store`](crate::Store).
///
/// `Clone` so the sweeper can keep a copy of the last failure around
/// while the original is logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The user record (or the requested part of it) does not exist.
    #[error("not found")]
    NotFound,

    /// The backend failed for any other reason.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The store was closed.
    #[error("store closed")]
    Closed,
}
