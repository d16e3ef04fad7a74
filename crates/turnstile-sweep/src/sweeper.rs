//! The sweeper task and its handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use turnstile_store::{Store, StoreError};

use crate::{SweepConfig, SweepError};

// ---------------------------------------------------------------------------
// State and metrics
// ---------------------------------------------------------------------------

/// Where the sweeper is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Stopped,
    Running,
    /// `close()` has been requested; the loop has not exited yet.
    Stopping,
}

/// Counters updated after every sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Sweeps that completed successfully.
    pub total_sweeps: u64,
    /// Blacklist entries removed across all sweeps.
    pub total_removed: u64,
    /// Sweeps that failed.
    pub total_failures: u64,
}

/// State shared between the handle and the background task.
///
/// Plain `std` mutexes: they are only held for a field update and never
/// across an `.await`.
#[derive(Debug)]
struct Shared {
    state: Mutex<SweeperState>,
    metrics: Mutex<SweepMetrics>,
    last_error: Mutex<Option<StoreError>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(SweeperState::Stopped),
            metrics: Mutex::new(SweepMetrics::default()),
            last_error: Mutex::new(None),
        }
    }

    fn set_state(&self, state: SweeperState) {
        *lock(&self.state) = state;
    }

    fn record(&self, result: Result<usize, StoreError>) {
        let mut metrics = lock(&self.metrics);
        match result {
            Ok(removed) => {
                metrics.total_sweeps += 1;
                metrics.total_removed += removed as u64;
                debug!(removed, "blacklist sweep finished");
            }
            Err(e) => {
                metrics.total_failures += 1;
                warn!(error = %e, "blacklist sweep failed, retrying next tick");
                *lock(&self.last_error) = Some(e);
            }
        }
    }
}

/// A poisoned lock only means another thread panicked mid-update of a
/// counter; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Sweeper
// ---------------------------------------------------------------------------

/// Periodically removes expired blacklist entries from a [`Store`].
///
/// Dropping a running sweeper stops its loop after the current sweep.
pub struct Sweeper<S: Store> {
    store: Arc<S>,
    config: SweepConfig,
    shared: Arc<Shared>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<S: Store> Sweeper<S> {
    /// Creates a stopped sweeper. Call [`start`](Self::start) to begin.
    pub fn new(store: Arc<S>, config: SweepConfig) -> Self {
        Self {
            store,
            config: config.validated(),
            shared: Arc::new(Shared::new()),
            stop_tx: None,
            task: None,
        }
    }

    /// Spawns the sweep loop on the current Tokio runtime.
    ///
    /// The first sweep happens one interval after this call.
    pub fn start(&mut self) -> Result<(), SweepError> {
        if self.task.is_some() {
            return Err(SweepError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        self.shared.set_state(SweeperState::Running);
        self.task = Some(tokio::spawn(run_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.shared),
            self.config.interval,
            stop_rx,
        )));
        self.stop_tx = Some(stop_tx);

        info!(interval_ms = self.config.interval.as_millis() as u64, "sweeper started");
        Ok(())
    }

    /// Stops the loop, waiting at most `deadline` for it to exit.
    ///
    /// On [`SweepError::DeadlineExceeded`] the loop keeps going in the
    /// background until its current sweep finishes, then exits.
    pub async fn close(&mut self, deadline: Duration) -> Result<(), SweepError> {
        let (Some(stop_tx), Some(mut task)) = (self.stop_tx.take(), self.task.take()) else {
            return Err(SweepError::NotRunning);
        };

        self.shared.set_state(SweeperState::Stopping);
        // The loop may already be gone if it panicked; that shows up below.
        let _ = stop_tx.send(());

        match time::timeout(deadline, &mut task).await {
            Ok(Ok(())) => {
                info!("sweeper stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                self.shared.set_state(SweeperState::Stopped);
                Err(SweepError::Task(e.to_string()))
            }
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "sweeper did not stop in time");
                Err(SweepError::DeadlineExceeded)
            }
        }
    }

    /// Runs one sweep right now, outside the timer, and records it.
    pub async fn sweep_now(&self) -> Result<usize, StoreError> {
        let result = self.store.sweep_expired_blacklist().await;
        self.shared.record(result.clone());
        result
    }

    pub fn state(&self) -> SweeperState {
        *lock(&self.shared.state)
    }

    /// The most recent sweep failure, if any sweep has failed.
    pub fn last_error(&self) -> Option<StoreError> {
        lock(&self.shared.last_error).clone()
    }

    pub fn metrics(&self) -> SweepMetrics {
        lock(&self.shared.metrics).clone()
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

/// The background loop. Exits when the stop signal arrives or its sender
/// is dropped.
async fn run_loop<S: Store>(
    store: Arc<S>,
    shared: Arc<Shared>,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    // A sweep that overruns the interval makes the timer skip the ticks it
    // missed instead of firing them back to back.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let result = store.sweep_expired_blacklist().await;
                shared.record(result);
            }
        }
    }

    shared.set_state(SweeperState::Stopped);
    debug!("sweeper loop exited");
}
