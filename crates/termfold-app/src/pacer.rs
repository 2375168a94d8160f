//! Frame pacing: coalesces repaints during line bursts.
//!
//! Folding is never deferred; only painting is. With a zero interval every
//! line is painted as it arrives.

use std::time::{Duration, Instant};

/// Maximum lines folded between two paints, whatever the interval
pub(crate) const MAX_PENDING_LINES: usize = 1000;

/// Decides when the run loop repaints
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    /// Lines folded since the last paint
    pending: usize,
    last_paint: Instant,
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: 0,
            last_paint: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a folded line.
    ///
    /// Returns true if a paint is due now.
    pub fn add(&mut self) -> bool {
        self.pending += 1;
        self.should_paint()
    }

    /// Check if a paint is due
    ///
    /// Returns true if lines are pending and either the interval has elapsed
    /// or the pending count reached [`MAX_PENDING_LINES`].
    pub fn should_paint(&self) -> bool {
        self.pending > 0
            && (self.pending >= MAX_PENDING_LINES || self.last_paint.elapsed() >= self.interval)
    }

    /// Note that a frame was painted; resets the timer
    pub fn painted(&mut self) {
        self.pending = 0;
        self.last_paint = Instant::now();
    }

    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Time until the pending lines must be painted (for event loop timing)
    ///
    /// `None` when nothing is pending.
    pub fn time_until_paint(&self) -> Option<Duration> {
        self.has_pending()
            .then(|| self.interval.saturating_sub(self.last_paint.elapsed()))
    }
}
