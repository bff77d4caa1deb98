//! Leaking bucket: arrivals queue up and drain at a constant rate.

use std::time::Duration;

use super::{AlgorithmState, Decision};

pub(super) fn decide(
    state: Option<AlgorithmState>,
    capacity: u64,
    leak_rate: f64,
    now: Duration,
) -> (Decision, AlgorithmState) {
    let (level, last_leak) = match state {
        Some(AlgorithmState::LeakingBucket { level, last_leak }) => (level, last_leak),
        _ => (0.0, now),
    };

    let elapsed = super::elapsed_since(now, last_leak);
    let level = (level - elapsed.as_secs_f64() * leak_rate).max(0.0);
    let capacity_f = capacity as f64;

    // Admission requires room for the whole request: the level is fractional,
    // and letting 4.5 of 5 through would settle above capacity.
    if level + 1.0 <= capacity_f {
        let level = level + 1.0;
        let decision = Decision {
            allowed: true,
            retry_after: Duration::ZERO,
            limit: capacity,
            remaining: (capacity_f - level) as u64,
            reset_after: drain_time(level, leak_rate),
        };
        (
            decision,
            AlgorithmState::LeakingBucket {
                level,
                last_leak: now,
            },
        )
    } else {
        // The drained level and the advanced timestamp are persisted even on
        // denial, so the same elapsed interval is never leaked twice.
        let decision = Decision {
            allowed: false,
            retry_after: Duration::from_secs_f64((level - capacity_f + 1.0) / leak_rate),
            limit: capacity,
            remaining: 0,
            reset_after: drain_time(level, leak_rate),
        };
        (
            decision,
            AlgorithmState::LeakingBucket {
                level,
                last_leak: now,
            },
        )
    }
}

/// Time until the bucket is fully drained.
fn drain_time(level: f64, leak_rate: f64) -> Duration {
    Duration::from_secs_f64(level / leak_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_fresh_bucket_admits_up_to_capacity() {
        let mut state = None;
        for i in 0..5 {
            let (decision, next) = decide(state, 5, 1.0, at(0.0));
            assert!(decision.allowed, "request {} should fit", i + 1);
            assert_eq!(decision.remaining, 4 - i);
            state = Some(next);
        }

        let (decision, _) = decide(state, 5, 1.0, at(0.0));
        assert!(!decision.allowed);
    }

    #[test]
    fn test_queue_grows_by_exactly_one_per_admission() {
        let mut state = None;
        for expected in 1..=4u64 {
            let (_, next) = decide(state, 10, 1.0, at(0.0));
            match next {
                AlgorithmState::LeakingBucket { level, .. } => {
                    assert_eq!(level, expected as f64)
                }
                _ => panic!("wrong state variant"),
            }
            state = Some(next);
        }
    }

    #[test]
    fn test_denial_retry_after_is_one_drain_slot_when_full() {
        let full = AlgorithmState::LeakingBucket {
            level: 5.0,
            last_leak: at(0.0),
        };
        let (decision, _) = decide(Some(full), 5, 2.0, at(0.0));
        assert!(!decision.allowed);
        // One slot frees after 1/leak_rate seconds.
        assert_eq!(decision.retry_after, at(0.5));
    }

    #[test]
    fn test_bucket_drains_over_time() {
        let full = AlgorithmState::LeakingBucket {
            level: 5.0,
            last_leak: at(0.0),
        };
        // Two seconds at 1/sec leaks two slots.
        let (decision, next) = decide(Some(full), 5, 1.0, at(2.0));
        assert!(decision.allowed);
        match next {
            AlgorithmState::LeakingBucket { level, .. } => assert_eq!(level, 4.0),
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_denied_retry_at_same_instant_is_idempotent() {
        let full = AlgorithmState::LeakingBucket {
            level: 5.0,
            last_leak: at(1.0),
        };
        let (first, state) = decide(Some(full), 5, 1.0, at(1.0));
        let (second, state) = decide(Some(state), 5, 1.0, at(1.0));
        assert_eq!(first, second);
        match state {
            AlgorithmState::LeakingBucket { level, .. } => assert_eq!(level, 5.0),
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_denial_persists_drained_level() {
        let full = AlgorithmState::LeakingBucket {
            level: 5.0,
            last_leak: at(0.0),
        };
        // Half a second leaks 0.5; still >= capacity - 1 + 1, so denied, but
        // the partial drain must not be lost.
        let (decision, next) = decide(Some(full), 5, 1.0, at(0.5));
        assert!(!decision.allowed);
        match next {
            AlgorithmState::LeakingBucket { level, last_leak } => {
                assert_eq!(level, 4.5);
                assert_eq!(last_leak, at(0.5));
            }
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_clock_regression_leaks_nothing() {
        let state = AlgorithmState::LeakingBucket {
            level: 3.0,
            last_leak: at(10.0),
        };
        let (decision, next) = decide(Some(state), 5, 1.0, at(4.0));
        assert!(decision.allowed);
        match next {
            AlgorithmState::LeakingBucket { level, .. } => assert_eq!(level, 4.0),
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_level_never_goes_negative() {
        let state = AlgorithmState::LeakingBucket {
            level: 1.0,
            last_leak: at(0.0),
        };
        // An hour of leaking would drain far below zero without the clamp.
        let (_, next) = decide(Some(state), 5, 1.0, at(3600.0));
        match next {
            AlgorithmState::LeakingBucket { level, .. } => assert_eq!(level, 1.0),
            _ => panic!("wrong state variant"),
        }
    }
}
