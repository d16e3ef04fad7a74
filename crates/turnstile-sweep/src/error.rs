//! Error types for the sweeper.

/// Errors from starting or stopping a [`Sweeper`](crate::Sweeper).
///
/// Failures of individual sweeps are not here: they are recorded and
/// retried, never returned.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// `start()` was called on a sweeper that is already running.
    #[error("sweeper already running")]
    AlreadyRunning,

    /// `close()` was called on a sweeper that is not running.
    #[error("sweeper not running")]
    NotRunning,

    /// The loop did not exit before the shutdown deadline.
    #[error("sweeper shutdown deadline exceeded")]
    DeadlineExceeded,

    /// The background task panicked or was aborted.
    #[error("sweeper task failed: {0}")]
    Task(String),
}
