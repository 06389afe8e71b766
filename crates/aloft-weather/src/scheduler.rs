//! Refresh timing.
//!
//! The next refresh is a one-shot delay re-derived after every cycle, so
//! the schedule stays aligned to wall-clock bucket boundaries instead of
//! drifting like a fixed interval would.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Delay until the next granularity-aligned wall-clock boundary.
pub fn delay_until_boundary(epoch_secs: u64, granularity_secs: u64) -> Duration {
    let granularity = granularity_secs.max(1);
    Duration::from_secs(granularity - epoch_secs % granularity)
}

/// Uniform jitter in `[0, cap_secs)`, spreading clients off the shared
/// boundary.
pub fn refresh_jitter(cap_secs: u64) -> Duration {
    if cap_secs == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..cap_secs * 1000))
}

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    granularity_secs: u64,
    jitter_secs: u64,
}

impl RefreshScheduler {
    pub fn new(granularity_minutes: u32, jitter_secs: u64) -> Self {
        Self {
            granularity_secs: u64::from(granularity_minutes.max(1)) * 60,
            jitter_secs,
        }
    }

    /// One-shot delay until just past the next boundary.
    pub fn next_delay(&self, now: SystemTime) -> Duration {
        let epoch_secs = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        delay_until_boundary(epoch_secs, self.granularity_secs) + refresh_jitter(self.jitter_secs)
    }
}
