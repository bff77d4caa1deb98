//! Fixed window: a counter over wall-aligned windows of fixed length.

use std::time::Duration;

use super::{AlgorithmState, Decision};

pub(super) fn decide(
    state: Option<AlgorithmState>,
    limit: u64,
    window_secs: u64,
    now: Duration,
) -> (Decision, AlgorithmState) {
    let window = Duration::from_secs(window_secs);
    // Windows are aligned to the clock, not to the first request: every key
    // sharing a window length resets on the same boundaries.
    let aligned_start = Duration::from_secs((now.as_secs() / window_secs) * window_secs);

    let (window_start, count) = match state {
        Some(AlgorithmState::FixedWindow {
            window_start,
            count,
        }) if now < window_start + window => (window_start, count),
        // Fresh key, expired window, or mismatched variant.
        _ => (aligned_start, 0),
    };

    let until_reset = (window_start + window).saturating_sub(now);

    if count < limit {
        let count = count + 1;
        let decision = Decision {
            allowed: true,
            retry_after: Duration::ZERO,
            limit,
            remaining: limit - count,
            reset_after: until_reset,
        };
        (
            decision,
            AlgorithmState::FixedWindow {
                window_start,
                count,
            },
        )
    } else {
        // Denials leave the count alone; only window-reset bookkeeping above
        // may have changed the state.
        let decision = Decision {
            allowed: false,
            retry_after: until_reset,
            limit,
            remaining: 0,
            reset_after: until_reset,
        };
        (
            decision,
            AlgorithmState::FixedWindow {
                window_start,
                count,
            },
        )
    }
}
