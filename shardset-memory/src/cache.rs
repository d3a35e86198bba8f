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

use std::{
    fmt::Debug,
    hash::Hash,
    sync::{Arc, OnceLock},
};

use equivalent::Equivalent;
use itertools::Itertools;
use parking_lot::RwLock;
use shardset_common::{
    code::{DefaultHasher, HashBuilder, Key, Value},
    error::{Error, ErrorKind, Result},
    event::EventListener,
};

use crate::{eviction::EvictionConfig, shard::Shard};

/// Builder of [`Cache`].
pub struct CacheBuilder<K, V, S = DefaultHasher> {
    shards: usize,
    capacity_per_shard: usize,
    eviction_config: Option<EvictionConfig<K, V>>,
    hash_builder: S,
    event_listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
}

impl<K, V> Default for CacheBuilder<K, V, DefaultHasher>
where
    K: Key,
    V: Value,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheBuilder<K, V, DefaultHasher>
where
    K: Key,
    V: Value,
{
    /// Create a builder of a single unbounded shard without eviction policy.
    pub fn new() -> Self {
        Self {
            shards: 1,
            capacity_per_shard: usize::MAX,
            eviction_config: None,
            hash_builder: DefaultHasher::default(),
            event_listener: None,
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    /// Set the shard count. Entries are routed to shards by the hash of their keys.
    ///
    /// The default value is 1.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the max entry count of each shard.
    ///
    /// The capacity is only enforced while an eviction policy is attached. The default value is `usize::MAX`.
    pub fn with_capacity_per_shard(mut self, capacity_per_shard: usize) -> Self {
        self.capacity_per_shard = capacity_per_shard;
        self
    }

    /// Set the eviction policy attached to every shard.
    ///
    /// Without one, entries only leave the cache on explicit eviction.
    pub fn with_eviction_config(mut self, eviction_config: impl Into<EvictionConfig<K, V>>) -> Self {
        self.eviction_config = Some(eviction_config.into());
        self
    }

    /// Set the event listener notified of the entries leaving the cache.
    pub fn with_event_listener(mut self, event_listener: Arc<dyn EventListener<Key = K, Value = V>>) -> Self {
        self.event_listener = Some(event_listener);
        self
    }

    /// Set the hash builder used to route keys to shards.
    pub fn with_hash_builder<OS>(self, hash_builder: OS) -> CacheBuilder<K, V, OS>
    where
        OS: HashBuilder,
    {
        CacheBuilder {
            shards: self.shards,
            capacity_per_shard: self.capacity_per_shard,
            eviction_config: self.eviction_config,
            hash_builder,
            event_listener: self.event_listener,
        }
    }

    /// Build the cache with the given configuration.
    pub fn build(self) -> Result<Cache<K, V, S>> {
        if self.shards == 0 {
            return Err(Error::config("shards must be greater than zero").with_context("shards", self.shards));
        }
        if self.capacity_per_shard == 0 {
            return Err(Error::config("capacity per shard must be greater than zero")
                .with_context("capacity_per_shard", self.capacity_per_shard));
        }
        if let Some(config) = self.eviction_config.as_ref() {
            config.validate()?;
        }

        let inner = CacheInner {
            shards: (0..self.shards).map(|_| OnceLock::new()).collect_vec(),
            capacity_per_shard: self.capacity_per_shard,
            eviction_config: RwLock::new(self.eviction_config),
            hash_builder: Arc::new(self.hash_builder),
            event_listener: self.event_listener,
        };
        Ok(Cache { inner: Arc::new(inner) })
    }
}

struct CacheInner<K, V, S> {
    shards: Vec<OnceLock<Shard<K, V, S>>>,
    capacity_per_shard: usize,

    /// Config of the policy attached to every shard. Shards are created under its read lock, so a shard never
    /// misses a reconfiguration.
    eviction_config: RwLock<Option<EvictionConfig<K, V>>>,

    hash_builder: Arc<S>,
    event_listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
}

/// A sharded in-memory cache with pluggable eviction policy.
///
/// Keys are routed to a fixed number of shards by their hash. Shards are created on first use. Each shard holds at
/// most `capacity_per_shard` entries while an eviction policy is attached, the policy decides which entry is
/// sacrificed. The policy can be replaced at any time and the change applies to every shard, existing or future.
///
/// The cache is cheap to clone, clones share the same shards.
pub struct Cache<K, V, S = DefaultHasher> {
    inner: Arc<CacheInner<K, V, S>>,
}

impl<K, V, S> Clone for Cache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S> Debug for Cache<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.inner.shards.len())
            .field("capacity_per_shard", &self.inner.capacity_per_shard)
            .field("eviction_config", &*self.inner.eviction_config.read())
            .finish()
    }
}

impl<K, V> Default for Cache<K, V, DefaultHasher>
where
    K: Key,
    V: Value,
{
    /// A single unbounded shard without eviction policy.
    fn default() -> Self {
        Self::new(1, usize::MAX)
    }
}

impl<K, V> Cache<K, V, DefaultHasher>
where
    K: Key,
    V: Value,
{
    /// Create a cache without eviction policy.
    ///
    /// # Panics
    ///
    /// Panics if `shards` or `capacity_per_shard` is zero.
    pub fn new(shards: usize, capacity_per_shard: usize) -> Self {
        assert!(shards > 0, "shards must be greater than zero.");
        assert!(capacity_per_shard > 0, "capacity per shard must be greater than zero.");

        let inner = CacheInner {
            shards: (0..shards).map(|_| OnceLock::new()).collect_vec(),
            capacity_per_shard,
            eviction_config: RwLock::new(None),
            hash_builder: Arc::default(),
            event_listener: None,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Create a builder of the cache.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    /// Insert the entry if the key is absent. Returns `false` and keeps the present value otherwise.
    pub fn add(&self, key: K, value: V) -> bool {
        let hash = self.inner.hash_builder.hash_one(&key);
        self.shard_or_init(hash).add_with_hash(hash, key, value)
    }

    /// Get a clone of the value of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.shard_or_init(hash).get_with_hash(hash, key)
    }

    /// Remove `key` and return its value.
    pub fn evict<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.shard_or_init(hash).evict_with_hash(hash, key)
    }

    /// Returns `true` if `key` is present, without counting as an access.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.inner.shards[self.shard_index_for(hash)]
            .get()
            .is_some_and(|shard| shard.contains_with_hash(hash, key))
    }

    /// Attach a fresh instance of the policy to every existing shard and to the shards created later.
    ///
    /// An invalid config is rejected before any shard is touched. Failures of existing shards to build their
    /// instance are reported together, those shards keep their previous policy.
    pub fn set_eviction_policy(&self, config: impl Into<EvictionConfig<K, V>>) -> Result<()> {
        let config = config.into();
        config.validate()?;

        let mut current = self.inner.eviction_config.write();
        let errs = self
            .inner
            .shards
            .iter()
            .filter_map(|slot| slot.get())
            .filter_map(|shard| {
                shard
                    .set_eviction_policy(&config)
                    .err()
                    .map(|e| e.with_context("shard", shard.index()))
            })
            .collect_vec();
        *current = Some(config);
        drop(current);

        if !errs.is_empty() {
            tracing::warn!("[cache]: {} shards failed to attach the eviction policy", errs.len());
            return Err(Error::multiple(ErrorKind::Config, "attach eviction policy failed", errs));
        }
        Ok(())
    }

    /// Detach the policy from every shard. Entries only leave the cache on explicit eviction afterwards.
    pub fn remove_eviction_policy(&self) {
        let mut current = self.inner.eviction_config.write();
        self.inner
            .shards
            .iter()
            .filter_map(|slot| slot.get())
            .for_each(|shard| shard.remove_eviction_policy());
        *current = None;
    }

    /// Count of entries of all shards.
    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .filter_map(|slot| slot.get())
            .map(|shard| shard.count())
            .sum()
    }

    /// Returns `true` if the cache holds no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shard count of the cache.
    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    /// Max entry count of each shard.
    pub fn capacity_per_shard(&self) -> usize {
        self.inner.capacity_per_shard
    }

    /// Get the shard of `index`, if it has been created.
    pub fn shard(&self, index: usize) -> Option<&Shard<K, V, S>> {
        self.inner.shards.get(index)?.get()
    }

    /// Index of the shard `key` is routed to.
    pub fn shard_index<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        self.shard_index_for(self.inner.hash_builder.hash_one(key))
    }

    /// Hash builder of the cache.
    pub fn hash_builder(&self) -> &Arc<S> {
        &self.inner.hash_builder
    }

    fn shard_index_for(&self, hash: u64) -> usize {
        match self.inner.shards.len() {
            1 => 0,
            shards => hash as usize % shards,
        }
    }

    fn shard_or_init(&self, hash: u64) -> &Shard<K, V, S> {
        let index = self.shard_index_for(hash);
        let slot = &self.inner.shards[index];
        if let Some(shard) = slot.get() {
            return shard;
        }

        let config = self.inner.eviction_config.read();
        slot.get_or_init(|| {
            let shard = Shard::open(
                index,
                self.inner.capacity_per_shard,
                self.inner.hash_builder.clone(),
                self.inner.event_listener.clone(),
            );
            if let Some(config) = config.as_ref() {
                if let Err(e) = shard.set_eviction_policy(config) {
                    tracing::error!("[cache]: attach eviction policy to shard {index} failed: {e}");
                }
            }
            tracing::debug!("[cache]: shard {index} created");
            shard
        })
    }
}
