//! Per-key state storage.

mod memory;

pub use memory::{MemoryStore, SweeperHandle};

use std::time::Duration;

use async_trait::async_trait;

use crate::algorithm::AlgorithmState;
use crate::error::StoreError;
use crate::key::RateLimitKey;

/// Closure applied to a key's state inside [`KeyStore::update`].
///
/// Receives the stored state (`None` for a fresh or expired key) and returns
/// the state to persist. It runs while the store holds the key's entry, so it
/// must be quick and must not block.
pub type StateUpdate<'a> = &'a mut (dyn FnMut(Option<AlgorithmState>) -> AlgorithmState + Send);

/// Keyed state storage with atomic per-key read-modify-write.
///
/// `get` and `put` are individually atomic. `update` is the serialization
/// point for a whole fetch-decide-persist step: two concurrent `update` calls
/// for the same key must not interleave, or both read the same stale state
/// and budget gets double-counted. Updates for different keys should proceed
/// in parallel.
///
/// Implementations may serialize with a per-key lock, compare-and-swap, or an
/// owning actor per shard; the engine only relies on the contract.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the live state for a key. `None` if absent or expired.
    async fn get(&self, key: &RateLimitKey) -> Result<Option<AlgorithmState>, StoreError>;

    /// Replace the state for a key, retaining it for at least `ttl` past
    /// this write.
    async fn put(
        &self,
        key: &RateLimitKey,
        state: AlgorithmState,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Atomically read, transform, and persist the state for a key.
    ///
    /// Either the whole step happens or none of it does; a caller that gives
    /// up waiting observes no partial mutation.
    async fn update(
        &self,
        key: &RateLimitKey,
        ttl: Duration,
        apply: StateUpdate<'_>,
    ) -> Result<(), StoreError>;
}
