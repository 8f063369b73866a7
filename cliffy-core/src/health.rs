//! Scheduler-level health counters (spec §5 "Health metrics"). Exposed
//! for observability only; the current core does not act on them.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct HealthCounters {
    consecutive_successes: AtomicU32,
    consecutive_failures: AtomicU32,
}

impl HealthCounters {
    pub fn record_success(&self) {
        self.consecutive_successes.fetch_add(1, Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        self.consecutive_successes.store(0, Ordering::SeqCst);
    }

    /// True when `consecutive_failures >= 3` and `consecutive_successes == 0`.
    pub fn should_back_off(&self) -> bool {
        self.consecutive_failures.load(Ordering::SeqCst) >= 3
            && self.consecutive_successes.load(Ordering::SeqCst) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backs_off_after_three_consecutive_failures() {
        let health = HealthCounters::default();
        assert!(!health.should_back_off());
        health.record_failure();
        health.record_failure();
        assert!(!health.should_back_off());
        health.record_failure();
        assert!(health.should_back_off());
    }

    #[test]
    fn success_resets_the_failure_streak() {
        let health = HealthCounters::default();
        health.record_failure();
        health.record_failure();
        health.record_failure();
        assert!(health.should_back_off());
        health.record_success();
        assert!(!health.should_back_off());
    }
}
