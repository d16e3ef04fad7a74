//! Blacklist sweeper for Turnstile.
//!
//! Every revoked signed token is kept on the blacklist until it would
//! have expired anyway. After that the entry is dead weight. The
//! [`Sweeper`] runs a background task that periodically asks the
//! [`Store`] to drop those entries.
//!
//! # Lifecycle
//!
//! ```text
//!   Stopped ──start()──→ Running ──close()──→ Stopping ──(loop exits)──→ Stopped
//! ```
//!
//! A failed sweep is recorded ([`Sweeper::last_error`]) and logged, and
//! the next tick simply tries again. Sweeps never overlap: the loop
//! awaits each sweep before it looks at the timer again, and ticks that
//! were missed meanwhile are skipped rather than bunched up.
//!
//! # Shutdown
//!
//! [`Sweeper::close`] waits for the in-flight sweep (if any) to finish
//! and the loop to exit, up to a deadline. If the deadline wins, the
//! loop is left to finish on its own and
//! [`SweepError::DeadlineExceeded`] is returned.

mod config;
mod error;
mod sweeper;

pub use config::SweepConfig;
pub use error::SweepError;
pub use sweeper::{SweepMetrics, Sweeper, SweeperState};

#[doc(no_inline)]
pub use turnstile_store::Store;
