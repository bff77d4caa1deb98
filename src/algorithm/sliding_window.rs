//! Sliding window: a log of arrival times over a trailing window.

use std::collections::VecDeque;
use std::time::Duration;

use super::{AlgorithmState, Decision};

pub(super) fn decide(
    state: Option<AlgorithmState>,
    limit: u64,
    window_secs: u64,
    now: Duration,
) -> (Decision, AlgorithmState) {
    let window = Duration::from_secs(window_secs);
    let mut arrivals = match state {
        Some(AlgorithmState::SlidingWindow { arrivals }) => arrivals,
        _ => VecDeque::new(),
    };

    // The log is ordered oldest-first; a regressed clock would break that, so
    // the arrival time is clamped forward to the newest recorded entry.
    let now = arrivals.back().map_or(now, |last| now.max(*last));

    // Prefix trim: drop everything that has slid out of the window.
    let cutoff = now.saturating_sub(window);
    while arrivals.front().is_some_and(|first| *first < cutoff) {
        arrivals.pop_front();
    }

    let count = arrivals.len() as u64;
    if count < limit {
        arrivals.push_back(now);
        let reset_after = last_expiry(&arrivals, window, now);
        let decision = Decision {
            allowed: true,
            retry_after: Duration::ZERO,
            limit,
            remaining: limit - count - 1,
            reset_after,
        };
        (decision, AlgorithmState::SlidingWindow { arrivals })
    } else {
        // The oldest retained arrival frees the next slot when it expires.
        // The purge above is bookkeeping and gets persisted even on denial.
        let retry_after = arrivals
            .front()
            .map_or(Duration::ZERO, |oldest| (*oldest + window).saturating_sub(now));
        let reset_after = last_expiry(&arrivals, window, now);
        let decision = Decision {
            allowed: false,
            retry_after,
            limit,
            remaining: 0,
            reset_after,
        };
        (decision, AlgorithmState::SlidingWindow { arrivals })
    }
}

/// Time until the newest arrival expires and the window is fully clear.
fn last_expiry(arrivals: &VecDeque<Duration>, window: Duration, now: Duration) -> Duration {
    arrivals
        .back()
        .map_or(Duration::ZERO, |newest| (*newest + window).saturating_sub(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_sliding_correctness() {
        // Limit 3 over a 1s window.
        let mut state = None;
        for t in [0.0, 0.3, 0.6] {
            let (decision, next) = decide(state, 3, 1, at(t));
            assert!(decision.allowed, "arrival at t={} should pass", t);
            state = Some(next);
        }

        let (decision, next) = decide(state, 3, 1, at(0.9));
        assert!(!decision.allowed);
        // The t=0.0 arrival frees its slot at t=1.0.
        assert_eq!(decision.retry_after, at(0.1));
        state = Some(next);

        // At t=1.1 the t=0.0 arrival has expired.
        let (decision, _) = decide(state, 3, 1, at(1.1));
        assert!(decision.allowed);
    }

    #[test]
    fn test_purge_is_a_prefix_trim() {
        let arrivals = VecDeque::from(vec![at(0.0), at(0.3), at(0.6), at(2.5)]);
        let state = AlgorithmState::SlidingWindow { arrivals };

        let (decision, next) = decide(Some(state), 3, 1, at(3.0));
        assert!(decision.allowed);
        match next {
            AlgorithmState::SlidingWindow { arrivals } => {
                // Only t=2.5 survived the trim, plus the new arrival.
                assert_eq!(arrivals, VecDeque::from(vec![at(2.5), at(3.0)]));
            }
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_denial_persists_purge_but_not_the_arrival() {
        let arrivals = VecDeque::from(vec![at(0.0), at(5.0), at(5.5)]);
        let state = AlgorithmState::SlidingWindow { arrivals };

        let (decision, next) = decide(Some(state), 2, 2, at(6.0));
        assert!(!decision.allowed);
        match next {
            AlgorithmState::SlidingWindow { arrivals } => {
                // t=0.0 was trimmed; the denied arrival was not recorded.
                assert_eq!(arrivals, VecDeque::from(vec![at(5.0), at(5.5)]));
            }
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_denied_retry_at_same_instant_is_idempotent() {
        let arrivals = VecDeque::from(vec![at(1.0), at(1.2)]);
        let state = AlgorithmState::SlidingWindow { arrivals };

        let (first, state) = decide(Some(state), 2, 10, at(2.0));
        let (second, _) = decide(Some(state), 2, 10, at(2.0));
        assert!(!first.allowed);
        assert_eq!(first, second);
    }

    #[test]
    fn test_clock_regression_keeps_log_ordered() {
        let arrivals = VecDeque::from(vec![at(4.0), at(5.0)]);
        let state = AlgorithmState::SlidingWindow { arrivals };

        // Clock jumped back; the new arrival is clamped to t=5.0.
        let (decision, next) = decide(Some(state), 5, 10, at(3.0));
        assert!(decision.allowed);
        match next {
            AlgorithmState::SlidingWindow { arrivals } => {
                let ordered = arrivals
                    .iter()
                    .zip(arrivals.iter().skip(1))
                    .all(|(a, b)| a <= b);
                assert!(ordered);
                assert_eq!(*arrivals.back().unwrap(), at(5.0));
            }
            _ => panic!("wrong state variant"),
        }
    }

    #[test]
    fn test_remaining_reflects_window_occupancy() {
        let (decision, state) = decide(None, 3, 60, at(0.0));
        assert_eq!(decision.remaining, 2);
        let (decision, _) = decide(Some(state), 3, 60, at(1.0));
        assert_eq!(decision.remaining, 1);
    }
}
