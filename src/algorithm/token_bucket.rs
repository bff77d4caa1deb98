//! Token bucket: a refilling pool of tokens, one spent per request.

use std::time::Duration;

use super::{AlgorithmState, Decision};

pub(super) fn decide(
    state: Option<AlgorithmState>,
    capacity: u64,
    refill_rate: f64,
    now: Duration,
) -> (Decision, AlgorithmState) {
    let capacity_f = capacity as f64;
    // A fresh key starts with a full pool: the burst allowance is available
    // immediately.
    let (tokens, last_refill) = match state {
        Some(AlgorithmState::TokenBucket {
            available_tokens,
            last_refill,
        }) => (available_tokens, last_refill),
        _ => (capacity_f, now),
    };

    let elapsed = super::elapsed_since(now, last_refill);
    let tokens = (tokens + elapsed.as_secs_f64() * refill_rate).min(capacity_f);

    if tokens >= 1.0 {
        let tokens = tokens - 1.0;
        let decision = Decision {
            allowed: true,
            retry_after: Duration::ZERO,
            limit: capacity,
            remaining: tokens as u64,
            reset_after: refill_time(capacity_f - tokens, refill_rate),
        };
        (
            decision,
            AlgorithmState::TokenBucket {
                available_tokens: tokens,
                last_refill: now,
            },
        )
    } else {
        // Refilled amount and advanced timestamp are persisted on denial too,
        // so the same elapsed interval is never refilled twice.
        let decision = Decision {
            allowed: false,
            retry_after: Duration::from_secs_f64((1.0 - tokens) / refill_rate),
            limit: capacity,
            remaining: 0,
            reset_after: refill_time(capacity_f - tokens, refill_rate),
        };
        (
            decision,
            AlgorithmState::TokenBucket {
                available_tokens: tokens,
                last_refill: now,
            },
        )
    }
}

/// Time until `deficit` tokens have been restored.
fn refill_time(deficit: f64, refill_rate: f64) -> Duration {
    Duration::from_secs_f64(deficit.max(0.0) / refill_rate)
}
