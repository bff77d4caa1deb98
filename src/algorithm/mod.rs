//! Rate limit decision algorithms.
//!
//! Each algorithm is a pure function over (previous state, config, arrival
//! time). Nothing here touches shared state or the clock; serialization of
//! concurrent decisions for one key is the key store's job, which keeps the
//! algorithms deterministic and the storage backend substitutable.

mod fixed_window;
mod leaking_bucket;
mod sliding_window;
mod token_bucket;

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AlgorithmConfig;

/// Mutable per-key algorithm state.
///
/// Serializable so stores can live out of process. Absent state means a fresh
/// key with its full budget available, so stores are free to evict idle
/// entries once their TTL lapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlgorithmState {
    /// Leaking bucket queue depth and when it last drained.
    ///
    /// The level is fractional: draining applies `elapsed * leak_rate`, which
    /// is rarely a whole number of requests.
    LeakingBucket { level: f64, last_leak: Duration },
    /// Token bucket pool and when it last refilled.
    TokenBucket {
        available_tokens: f64,
        last_refill: Duration,
    },
    /// Fixed window start (aligned to window boundaries) and its count.
    FixedWindow { window_start: Duration, count: u64 },
    /// Arrival times within the trailing window, oldest first.
    SlidingWindow { arrivals: VecDeque<Duration> },
}

/// The outcome of one rate limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// How long the client should wait before retrying. Zero when allowed.
    pub retry_after: Duration,
    /// The configured limit (capacity or per-window count).
    pub limit: u64,
    /// Whole units of budget still available after this decision.
    pub remaining: u64,
    /// Time until the budget is fully restored: window reset for the window
    /// algorithms, complete drain or refill for the buckets.
    pub reset_after: Duration,
}

/// Apply the configured algorithm to one arrival.
///
/// Absent state is treated as a fresh key with its full budget. So is state
/// whose variant does not match `config`: if the algorithm for a live key is
/// changed, the old variant's state is meaningless and gets discarded.
pub(crate) fn decide(
    state: Option<AlgorithmState>,
    config: &AlgorithmConfig,
    now: Duration,
) -> (Decision, AlgorithmState) {
    match *config {
        AlgorithmConfig::LeakingBucket {
            capacity,
            leak_rate_per_second,
        } => leaking_bucket::decide(state, capacity, leak_rate_per_second, now),
        AlgorithmConfig::TokenBucket {
            capacity,
            refill_rate_per_second,
        } => token_bucket::decide(state, capacity, refill_rate_per_second, now),
        AlgorithmConfig::FixedWindow { limit, window_secs } => {
            fixed_window::decide(state, limit, window_secs, now)
        }
        AlgorithmConfig::SlidingWindow { limit, window_secs } => {
            sliding_window::decide(state, limit, window_secs, now)
        }
    }
}

/// Elapsed time since `earlier`, clamped to zero if the clock regressed.
///
/// Clock skew is advisory, not fatal: a negative interval would leak or
/// refill a negative amount, so it is logged and treated as no time passing.
fn elapsed_since(now: Duration, earlier: Duration) -> Duration {
    if now < earlier {
        warn!(
            now_secs = now.as_secs_f64(),
            stored_secs = earlier.as_secs_f64(),
            "clock skew detected, clamping elapsed time to zero"
        );
        Duration::ZERO
    } else {
        now - earlier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_since_clamps_regression() {
        let earlier = Duration::from_secs(10);
        let now = Duration::from_secs(5);
        assert_eq!(elapsed_since(now, earlier), Duration::ZERO);
    }

    #[test]
    fn test_elapsed_since_forward() {
        let earlier = Duration::from_secs(5);
        let now = Duration::from_secs(7);
        assert_eq!(elapsed_since(now, earlier), Duration::from_secs(2));
    }

    #[test]
    fn test_mismatched_state_variant_is_discarded() {
        let config = AlgorithmConfig::token_bucket(5, 1.0).unwrap();
        let stale = AlgorithmState::FixedWindow {
            window_start: Duration::ZERO,
            count: 999,
        };

        // A fresh token bucket admits the request despite the stale window count.
        let (decision, state) = decide(Some(stale), &config, Duration::from_secs(100));
        assert!(decision.allowed);
        assert!(matches!(state, AlgorithmState::TokenBucket { .. }));
    }

    #[test]
    fn test_state_serialization_round_trip() {
        let state = AlgorithmState::SlidingWindow {
            arrivals: VecDeque::from(vec![Duration::from_millis(300), Duration::from_millis(600)]),
        };
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: AlgorithmState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(state, decoded);
    }
}
