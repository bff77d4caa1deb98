//! Algorithm configuration and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How many window (or full-drain) periods a key's state is retained past its
/// last request. Absent state is equivalent to a full budget, so expiry only
/// needs to outlive the period over which old state still matters.
const RETENTION_PERIODS: u32 = 3;

/// Floor for suggested state TTLs, so very fast buckets still survive
/// sub-second gaps between requests.
const MIN_STATE_TTL: Duration = Duration::from_secs(1);

/// Immutable parameters for one rate limit.
///
/// The variant selects the decision algorithm. The set is closed by design:
/// four well-understood algorithms, dispatched by configuration, rather than
/// open-ended plugin loading.
///
/// Serialized with an `algorithm` tag so rule files stay readable:
///
/// ```yaml
/// algorithm: token_bucket
/// capacity: 100
/// refill_rate_per_second: 10.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    /// Arrivals queue up and drain at a constant rate; full queue rejects.
    LeakingBucket {
        /// Maximum queue depth.
        capacity: u64,
        /// Requests drained per second.
        leak_rate_per_second: f64,
    },
    /// Token pool refilled at a constant rate; each request spends one token.
    TokenBucket {
        /// Maximum tokens held, which is also the burst allowance.
        capacity: u64,
        /// Tokens restored per second.
        refill_rate_per_second: f64,
    },
    /// Counter over wall-aligned windows of fixed length.
    ///
    /// Up to twice the limit can pass in quick succession around a window
    /// boundary. That is inherent to the algorithm, not a defect; pick
    /// `SlidingWindow` when boundary bursts matter.
    FixedWindow {
        /// Requests admitted per window.
        limit: u64,
        /// Window length in whole seconds.
        window_secs: u64,
    },
    /// Log of arrival times over a trailing window.
    SlidingWindow {
        /// Requests admitted per trailing window.
        limit: u64,
        /// Window length in whole seconds.
        window_secs: u64,
    },
}

impl AlgorithmConfig {
    /// Construct a validated leaking bucket configuration.
    pub fn leaking_bucket(capacity: u64, leak_rate_per_second: f64) -> Result<Self, ConfigError> {
        let config = Self::LeakingBucket {
            capacity,
            leak_rate_per_second,
        };
        config.validate()?;
        Ok(config)
    }

    /// Construct a validated token bucket configuration.
    pub fn token_bucket(capacity: u64, refill_rate_per_second: f64) -> Result<Self, ConfigError> {
        let config = Self::TokenBucket {
            capacity,
            refill_rate_per_second,
        };
        config.validate()?;
        Ok(config)
    }

    /// Construct a validated fixed window configuration.
    pub fn fixed_window(limit: u64, window_secs: u64) -> Result<Self, ConfigError> {
        let config = Self::FixedWindow { limit, window_secs };
        config.validate()?;
        Ok(config)
    }

    /// Construct a validated sliding window configuration.
    pub fn sliding_window(limit: u64, window_secs: u64) -> Result<Self, ConfigError> {
        let config = Self::SlidingWindow { limit, window_secs };
        config.validate()?;
        Ok(config)
    }

    /// Validate the parameters.
    ///
    /// Rejects anything that would make a bucket never drain or a window
    /// never reset. Called by the constructors, by rule loading, and by
    /// [`RateLimiter::check`](crate::limiter::RateLimiter::check), so a
    /// hand-built or deserialized config cannot reach a decision unchecked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::LeakingBucket {
                capacity,
                leak_rate_per_second,
            } => {
                if capacity == 0 {
                    return Err(ConfigError::ZeroCapacity);
                }
                validate_rate(leak_rate_per_second)
            }
            Self::TokenBucket {
                capacity,
                refill_rate_per_second,
            } => {
                if capacity == 0 {
                    return Err(ConfigError::ZeroCapacity);
                }
                validate_rate(refill_rate_per_second)
            }
            Self::FixedWindow { limit, window_secs } | Self::SlidingWindow { limit, window_secs } => {
                if limit == 0 {
                    return Err(ConfigError::ZeroLimit);
                }
                if window_secs == 0 {
                    return Err(ConfigError::ZeroWindow);
                }
                Ok(())
            }
        }
    }

    /// The configured limit or capacity, as reported in decisions.
    pub fn limit(&self) -> u64 {
        match *self {
            Self::LeakingBucket { capacity, .. } | Self::TokenBucket { capacity, .. } => capacity,
            Self::FixedWindow { limit, .. } | Self::SlidingWindow { limit, .. } => limit,
        }
    }

    /// Recommended retention for per-key state under this configuration.
    ///
    /// A few window lengths for the window algorithms, a few full-drain
    /// periods for the buckets. Once state has been idle that long, it is
    /// indistinguishable from a fresh full budget and can be evicted.
    pub fn state_ttl(&self) -> Duration {
        let period = match *self {
            Self::LeakingBucket {
                capacity,
                leak_rate_per_second,
            } => Duration::from_secs_f64(capacity as f64 / leak_rate_per_second),
            Self::TokenBucket {
                capacity,
                refill_rate_per_second,
            } => Duration::from_secs_f64(capacity as f64 / refill_rate_per_second),
            Self::FixedWindow { window_secs, .. } | Self::SlidingWindow { window_secs, .. } => {
                Duration::from_secs(window_secs)
            }
        };
        (period * RETENTION_PERIODS).max(MIN_STATE_TTL)
    }
}

fn validate_rate(rate: f64) -> Result<(), ConfigError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveRate(rate))
    }
}
