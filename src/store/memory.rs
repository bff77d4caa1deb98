//! Reference in-memory key store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::{KeyStore, StateUpdate};
use crate::algorithm::AlgorithmState;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::key::RateLimitKey;

/// A stored state and its eviction deadline.
#[derive(Debug, Clone)]
struct StoredEntry {
    state: AlgorithmState,
    expires_at: Duration,
}

/// Sharded in-memory [`KeyStore`].
///
/// Backed by a [`DashMap`]: updates for one key run under that key's entry
/// guard, which gives [`KeyStore::update`] the required serialization, while
/// keys on other shards proceed in parallel.
///
/// Expired entries are ignored on read and physically removed by
/// [`MemoryStore::sweep`], which [`MemoryStore::start_sweeper`] can run
/// periodically in the background.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<RateLimitKey, StoredEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create a store using the system wall clock for TTL accounting.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store reading expiry deadlines from the given clock.
    ///
    /// Use the same clock that drives the rate limiter, or TTLs will be
    /// measured on a different timeline than the states they guard.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "evicted expired rate limit state");
        }
        evicted
    }

    /// Spawn a background task sweeping expired entries every `interval`.
    ///
    /// The sweep runs independently of request handling. Dropping the
    /// returned handle stops the task.
    pub fn start_sweeper(self: Arc<Self>, interval: Duration) -> SweeperHandle {
        let store = self;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.sweep();
            }
        });
        SweeperHandle { task }
    }

    fn live_state(&self, key: &RateLimitKey, now: Duration) -> Option<AlgorithmState> {
        self.entries.get(key).and_then(|entry| {
            if entry.expires_at > now {
                Some(entry.state.clone())
            } else {
                None
            }
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn get(&self, key: &RateLimitKey) -> Result<Option<AlgorithmState>, StoreError> {
        Ok(self.live_state(key, self.clock.now()))
    }

    async fn put(
        &self,
        key: &RateLimitKey,
        state: AlgorithmState,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .insert(key.clone(), StoredEntry { state, expires_at });
        Ok(())
    }

    async fn update(
        &self,
        key: &RateLimitKey,
        ttl: Duration,
        apply: StateUpdate<'_>,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let expires_at = now + ttl;
        // The entry guard is held across the closure, serializing concurrent
        // updates for this key.
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = (occupied.get().expires_at > now).then(|| occupied.get().state.clone());
                let next = apply(current);
                occupied.insert(StoredEntry {
                    state: next,
                    expires_at,
                });
            }
            Entry::Vacant(vacant) => {
                let next = apply(None);
                vacant.insert(StoredEntry {
                    state: next,
                    expires_at,
                });
            }
        }
        Ok(())
    }
}

/// Owns the background sweep task; aborts it on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    task: tokio::task::JoinHandle<()>,
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
