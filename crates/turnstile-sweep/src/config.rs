//! Sweeper configuration.

use std::time::Duration;

use tracing::warn;

/// How often the sweeper runs.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps. Default: 15 seconds.
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
        }
    }
}

impl SweepConfig {
    /// Shortest interval the sweeper accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Raises an interval below [`Self::MIN_INTERVAL`] to the minimum.
    ///
    /// Called by [`Sweeper::new`](crate::Sweeper::new). A zero period
    /// would make the timer panic.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "sweep interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}
