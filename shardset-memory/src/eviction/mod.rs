// Copyright 2026 shardset Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, sync::Arc};

use shardset_common::{
    code::{Key, Value},
    error::Result,
};

use crate::eviction::{
    context::PolicyContext,
    expiration::{ExpirationConfig, ExpirationPolicy},
    recency::{LruConfig, MruConfig, RecencyPolicy},
};

/// The access observed by a shard and reported to its eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// The key is newly inserted into the shard.
    Added,
    /// The key is read from the shard.
    Get,
    /// The key has left the shard, by any cause.
    Evicted,
}

/// An eviction policy decides which key a shard sacrifices. The shard enforces capacity mechanically.
///
/// A policy instance is owned by exactly one shard. It only ever tracks keys and never touches the shard storage.
///
/// All methods can be called concurrently by multiple callers, the policy is responsible for its own
/// synchronization. The shard guarantees that the per-key order of [`EvictionPolicy::notify`] calls matches the
/// order of the storage mutations.
pub trait EvictionPolicy<K, V>: Send + Sync + 'static {
    /// Update the bookkeeping of `key` for a shard-level access.
    fn notify(&self, action: Action, key: &K, value: &V);

    /// The key the policy currently recommends to evict when the shard is over capacity.
    ///
    /// Returns `None` if nothing is tracked or if the policy does not evict on capacity pressure. The shard skips
    /// the eviction in that case.
    fn next_victim(&self) -> Option<K>;

    /// Called by the shard right before it applies an asynchronous eviction request for `key`.
    ///
    /// Returns `false` to drop a request that became stale between the time it was sent and the time it is
    /// applied.
    #[expect(unused_variables)]
    fn confirm_request(&self, key: &K) -> bool {
        true
    }
}

/// Factory of custom eviction policies.
///
/// The factory is called by the cache once for every shard that attaches the policy.
pub trait PolicyFactory<K, V>:
    Fn(&PolicyContext<K>) -> Result<Box<dyn EvictionPolicy<K, V>>> + Send + Sync + 'static
{
}
impl<K, V, T> PolicyFactory<K, V> for T where
    T: Fn(&PolicyContext<K>) -> Result<Box<dyn EvictionPolicy<K, V>>> + Send + Sync + 'static
{
}

/// Eviction policy config of the cache.
///
/// Built-in policies are configured by their config, custom policies by a [`PolicyFactory`].
pub enum EvictionConfig<K, V> {
    /// Evict the least recently used key.
    Lru(LruConfig),
    /// Evict the most recently used key.
    Mru(MruConfig),
    /// Evict keys idle for longer than the time-to-live, regardless of capacity.
    Expiration(ExpirationConfig),
    /// User-defined eviction policy.
    Custom(Arc<dyn PolicyFactory<K, V>>),
}

impl<K, V> Clone for EvictionConfig<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Lru(config) => Self::Lru(config.clone()),
            Self::Mru(config) => Self::Mru(config.clone()),
            Self::Expiration(config) => Self::Expiration(config.clone()),
            Self::Custom(factory) => Self::Custom(factory.clone()),
        }
    }
}

impl<K, V> Debug for EvictionConfig<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lru(config) => f.debug_tuple("EvictionConfig::Lru").field(config).finish(),
            Self::Mru(config) => f.debug_tuple("EvictionConfig::Mru").field(config).finish(),
            Self::Expiration(config) => f.debug_tuple("EvictionConfig::Expiration").field(config).finish(),
            Self::Custom(_) => f.debug_tuple("EvictionConfig::Custom").finish(),
        }
    }
}

impl<K, V> From<LruConfig> for EvictionConfig<K, V> {
    fn from(config: LruConfig) -> Self {
        Self::Lru(config)
    }
}

impl<K, V> From<MruConfig> for EvictionConfig<K, V> {
    fn from(config: MruConfig) -> Self {
        Self::Mru(config)
    }
}

impl<K, V> From<ExpirationConfig> for EvictionConfig<K, V> {
    fn from(config: ExpirationConfig) -> Self {
        Self::Expiration(config)
    }
}

impl<K, V> EvictionConfig<K, V>
where
    K: Key,
    V: Value,
{
    /// Wrap a custom policy factory.
    pub fn custom<F>(factory: F) -> Self
    where
        F: Fn(&PolicyContext<K>) -> Result<Box<dyn EvictionPolicy<K, V>>> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(factory))
    }

    /// Validate the config before any policy is built from it.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Expiration(config) => config.validate(),
            Self::Lru(_) | Self::Mru(_) | Self::Custom(_) => Ok(()),
        }
    }

    pub(crate) fn build(&self, context: &PolicyContext<K>) -> Result<Box<dyn EvictionPolicy<K, V>>> {
        match self {
            Self::Lru(_) => Ok(Box::new(RecencyPolicy::lru())),
            Self::Mru(_) => Ok(Box::new(RecencyPolicy::mru())),
            Self::Expiration(config) => {
                let policy = ExpirationPolicy::new(config.clone(), context.requester())?;
                Ok(Box::new(policy))
            }
            Self::Custom(factory) => factory(context),
        }
    }
}

/// Policy construction context and the asynchronous eviction channel.
pub mod context;
/// Time-based expiration policy.
pub mod expiration;
/// Slot-arena backed recency list.
pub mod list;
/// Recency-list policies: LRU and MRU.
pub mod recency;

/// Utilities for testing eviction policies.
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
