//! Core rate limiter orchestration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::algorithm::{self, AlgorithmState, Decision};
use crate::clock::{Clock, SystemClock};
use crate::config::AlgorithmConfig;
use crate::error::{ConfigError, Result};
use crate::key::RateLimitKey;
use crate::rules::RateLimitRules;
use crate::store::{KeyStore, MemoryStore};

/// The core rate limiter.
///
/// Resolves per-key state through the [`KeyStore`], applies the configured
/// algorithm, and persists the outcome, one serialized step per key. The
/// limiter itself holds no per-key state and is cheap to share: wrap it in an
/// [`Arc`] and call it from any task.
pub struct RateLimiter {
    store: Arc<dyn KeyStore>,
    clock: Arc<dyn Clock>,
    stats: LimiterStats,
}

impl RateLimiter {
    /// Create a limiter backed by an in-memory store and the system clock.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        Self::with_parts(store, clock)
    }

    /// Create a limiter over a specific store and clock.
    pub fn with_parts(store: Arc<dyn KeyStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            stats: LimiterStats::default(),
        }
    }

    /// Check one arrival against the configuration for its key.
    ///
    /// State is fetched, updated, and persisted in one atomic step per key,
    /// for allowed and denied requests alike. Absent state means a fresh key
    /// with its full budget.
    ///
    /// Store failures surface as [`FloodgateError::Store`]; whether those
    /// fail open or closed is the caller's policy, not the engine's.
    ///
    /// [`FloodgateError::Store`]: crate::error::FloodgateError::Store
    pub async fn check(&self, key: &RateLimitKey, config: &AlgorithmConfig) -> Result<Decision> {
        config.validate()?;

        let now = self.clock.now();
        trace!(key = %key, now_secs = now.as_secs_f64(), "checking rate limit");

        let mut decision = None;
        self.store
            .update(key, config.state_ttl(), &mut |state| {
                if state.is_none() {
                    debug!(key = %key, "creating rate limit state");
                }
                let (outcome, next) = algorithm::decide(state, config, now);
                decision = Some(outcome);
                next
            })
            .await?;

        // The closure runs exactly once when update succeeds.
        let decision = decision.expect("state update completed without a decision");

        self.stats.record(&decision);
        if decision.allowed {
            trace!(key = %key, remaining = decision.remaining, "request allowed");
        } else {
            debug!(
                key = %key,
                retry_after_secs = decision.retry_after.as_secs_f64(),
                "rate limit exceeded"
            );
        }

        Ok(decision)
    }

    /// Check one arrival against a rule set, resolved by the key's resource.
    ///
    /// Fails with [`ConfigError::NoMatchingRule`] when neither a
    /// resource-specific rule nor a default covers the key.
    pub async fn check_with_rules(
        &self,
        key: &RateLimitKey,
        rules: &RateLimitRules,
    ) -> Result<Decision> {
        let config = rules
            .resolve(&key.resource)
            .ok_or_else(|| ConfigError::NoMatchingRule(key.resource.clone()))?;
        self.check(key, config).await
    }

    /// The stored state for a key, without consuming any budget.
    pub async fn status(&self, key: &RateLimitKey) -> Result<Option<AlgorithmState>> {
        Ok(self.store.get(key).await?)
    }

    /// Decision counters accumulated since the limiter was created.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-free decision counters.
#[derive(Debug, Default)]
struct LimiterStats {
    total: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
}

impl LimiterStats {
    fn record(&self, decision: &Decision) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if decision.allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let allowed = self.allowed.load(Ordering::Relaxed);
        StatsSnapshot {
            total,
            allowed,
            denied: self.denied.load(Ordering::Relaxed),
            acceptance_rate: if total > 0 {
                allowed as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Point-in-time view of a limiter's decision counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Requests checked.
    pub total: u64,
    /// Requests allowed through.
    pub allowed: u64,
    /// Requests denied.
    pub denied: u64,
    /// Allowed over total, zero before any request.
    pub acceptance_rate: f64,
}
