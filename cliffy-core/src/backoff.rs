//! Computes retry delay from `(error class, attempt)` with jitter and
//! per-class caps (spec §4.2).

use std::time::Duration;

use rand::Rng;

use crate::classifier::ErrorClass;

struct ClassBounds {
    base: Duration,
    cap: Duration,
}

fn bounds_for(class: ErrorClass) -> ClassBounds {
    match class {
        ErrorClass::RateLimit => ClassBounds {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(120),
        },
        ErrorClass::Timeout => ClassBounds {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(60),
        },
        ErrorClass::Network => ClassBounds {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
        },
        // Unknown / other retryable, and any class that somehow reaches
        // backoff without being retried elsewhere.
        _ => ClassBounds {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
        },
    }
}

/// `attempt` is 1-based with respect to retries: the sleep precedes
/// attempt `N+1` where `N >= 1` (spec §4.2).
pub fn backoff_delay(class: ErrorClass, attempt: u32) -> Duration {
    backoff_delay_with_rng(class, attempt, &mut rand::rng())
}

fn backoff_delay_with_rng(class: ErrorClass, attempt: u32, rng: &mut impl Rng) -> Duration {
    let ClassBounds { base, cap } = bounds_for(class);

    let raw_secs = base.as_secs_f64() * 2f64.powi(attempt as i32);
    let raw = Duration::from_secs_f64(raw_secs.min(cap.as_secs_f64()));

    // Symmetric jitter of +/- 25%, clamped to at least base/2.
    let jitter_factor = rng.random_range(0.75..=1.25);
    let jittered_secs = raw.as_secs_f64() * jitter_factor;
    let floor_secs = base.as_secs_f64() / 2.0;

    Duration::from_secs_f64(jittered_secs.max(floor_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn delay(class: ErrorClass, attempt: u32) -> Duration {
        let mut rng = StdRng::seed_from_u64(42);
        backoff_delay_with_rng(class, attempt, &mut rng)
    }

    #[test]
    fn network_attempt_zero_within_s6_bounds() {
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = backoff_delay_with_rng(ErrorClass::Network, 0, &mut rng);
            assert!(d >= Duration::from_millis(375), "{d:?} too small");
            assert!(d <= Duration::from_millis(625), "{d:?} too large");
        }
    }

    #[test]
    fn rate_limit_attempt_one_within_s6_bounds() {
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = backoff_delay_with_rng(ErrorClass::RateLimit, 1, &mut rng);
            assert!(d >= Duration::from_millis(7_500), "{d:?} too small");
            assert!(d <= Duration::from_millis(12_500), "{d:?} too large");
        }
    }

    #[test]
    fn rate_limit_attempt_ten_respects_cap_plus_jitter() {
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = backoff_delay_with_rng(ErrorClass::RateLimit, 10, &mut rng);
            assert!(d <= Duration::from_secs(150), "{d:?} exceeds cap+25%");
        }
    }

    #[test]
    fn monotonic_up_to_jitter() {
        // delay(class, k+1) >= delay(class, k) / 2 for fixed class, across
        // the pre-cap growth region.
        let d0 = delay(ErrorClass::Timeout, 0);
        let d1 = delay(ErrorClass::Timeout, 1);
        assert!(d1.as_secs_f64() >= d0.as_secs_f64() / 2.0);
    }

    #[test]
    fn never_zero_and_never_absurdly_large() {
        for class in [
            ErrorClass::RateLimit,
            ErrorClass::Timeout,
            ErrorClass::Network,
            ErrorClass::Unknown,
        ] {
            for attempt in 0..20 {
                let d = delay(class, attempt);
                assert!(d > Duration::ZERO);
                assert!(d <= Duration::from_secs(150));
            }
        }
    }
}
