//! Monotonic wall-clock reads and the computation-time accounting helper.
//!
//! All timestamps in this crate are `f64` seconds since an arbitrary process-local
//! epoch, mirroring `MPI_Wtime()`'s contract: only differences between two reads are
//! meaningful.

use once_cell::sync::Lazy;
use std::time::Instant;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Current monotonic time, in seconds since an arbitrary per-process epoch.
pub fn now() -> f64 {
    EPOCH.elapsed().as_secs_f64()
}

/// Accumulates computation time between suspension points.
///
/// Every blocking/non-blocking initiate reads the elapsed time since the last reset
/// and folds it into the descriptor's `computation_time` accumulator; the timer is
/// then reset so the next interval starts fresh.
#[derive(Debug, Clone, Copy)]
pub struct ComputationTimer {
    last_reset: f64,
}

impl ComputationTimer {
    pub fn new() -> Self {
        ComputationTimer { last_reset: now() }
    }

    /// Seconds elapsed since the last reset, without resetting.
    pub fn elapsed(&self) -> f64 {
        now() - self.last_reset
    }

    /// Seconds elapsed since the last reset, then resets to the current time.
    pub fn take(&mut self) -> f64 {
        let t = now();
        let elapsed = t - self.last_reset;
        self.last_reset = t;
        elapsed
    }

    pub fn reset(&mut self) {
        self.last_reset = now();
    }
}

impl Default for ComputationTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_non_negative() {
        let timer = ComputationTimer::new();
        assert!(timer.elapsed() >= 0.0);
    }

    #[test]
    fn take_resets_baseline() {
        let mut timer = ComputationTimer::new();
        let first = timer.take();
        let second = timer.take();
        assert!(first >= 0.0);
        assert!(second >= 0.0);
        assert!(second <= first + 1e-3 || second < 1e-3);
    }
}
